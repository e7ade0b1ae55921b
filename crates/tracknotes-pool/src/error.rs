//! Error types for tracknotes-pool

use thiserror::Error;

/// Errors that may occur when checking out connections or running queries.
#[derive(Error, Debug)]
pub enum Error {
   /// The underlying SQLite connection could not be opened or configured.
   /// The pool does not retry; the failure surfaces to the immediate caller.
   #[error("failed to open SQLite connection: {0}")]
   Connect(#[source] sqlx::Error),

   /// A checkout waited longer than the configured timeout with no
   /// connection becoming available.
   #[error("timed out after {waited_ms}ms waiting for a pooled connection")]
   CheckoutTimeout {
      /// The configured checkout timeout, in milliseconds.
      waited_ms: u64,
   },

   /// The pool has been closed and no longer hands out connections.
   #[error("connection pool has been closed")]
   PoolClosed,

   /// The statement itself failed (constraint violation, syntax error,
   /// locked database). Propagated unchanged from sqlx after the connection
   /// has been released back to the pool.
   #[error(transparent)]
   Query(#[from] sqlx::Error),

   /// A column value could not be decoded into JSON.
   #[error("failed to decode column '{column}': {message}")]
   DecodeColumn { column: String, message: String },

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// A batch write failed and the subsequent rollback also failed.
   #[error("batch write failed: {batch_error}; rollback also failed: {rollback_error}")]
   BatchRollbackFailed {
      batch_error: String,
      rollback_error: String,
   },
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
