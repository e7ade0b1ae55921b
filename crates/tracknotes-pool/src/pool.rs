//! Bounded connection pool with FIFO checkout queueing
//!
//! ## State Management
//!
//! All pool state lives in a single [`PoolState`] behind a `std::sync::Mutex`.
//! Every mutation is a synchronous critical section; the lock is never held
//! across an `.await`, so checkouts, releases, and timeouts cannot observe a
//! half-updated pool.
//!
//! ## Checkout Order
//!
//! 1. Idle connection available → handed out immediately (fast path)
//! 2. Below `max_connections` → a fresh connection is opened for the caller
//! 3. At capacity → the caller queues behind `checkout_timeout`
//!
//! A released connection always goes to the longest-waiting queued caller
//! before the idle list is considered, so a checkout that has been waiting
//! cannot lose its turn to the idle fast path.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Connection};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::config::PoolConfig;
use crate::{Error, Result};

/// A queued checkout: the sender half of the rendezvous that will carry a
/// released connection to the suspended caller.
struct Waiter {
   id: u64,
   tx: oneshot::Sender<SqliteConnection>,
}

#[derive(Default)]
struct PoolState {
   /// Connections owned by the pool and not on loan
   idle: Vec<SqliteConnection>,

   /// Number of connections currently on loan to callers
   active: usize,

   /// Checkouts suspended because the pool was at capacity, oldest first
   waiters: VecDeque<Waiter>,

   /// Monotonic waiter id, used to remove a specific waiter on timeout
   next_waiter_id: u64,

   /// Set by close(); rejects further checkouts
   closed: bool,
}

/// Bounded pool of connections to a single SQLite database file.
///
/// Invariants:
///
/// - `idle.len() + active <= max_connections` at all times
/// - a connection is never simultaneously idle and on loan
/// - waiters are served strictly FIFO relative to each other
pub struct ConnectionPool {
   state: Mutex<PoolState>,
   config: PoolConfig,
   path: PathBuf,
}

impl ConnectionPool {
   /// Open a pool for the database file at `path`.
   ///
   /// `min_connections` connections are opened up front, so a file that
   /// cannot be opened or configured fails construction rather than the
   /// first request.
   pub async fn connect(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
      let pool = Self {
         state: Mutex::new(PoolState::default()),
         config: config.normalized(),
         path: path.as_ref().to_path_buf(),
      };

      for _ in 0..pool.config.min_connections {
         let conn = pool.open_connection().await?;
         pool.lock_state().idle.push(conn);
      }

      debug!(
         path = %pool.path.display(),
         min = pool.config.min_connections,
         max = pool.config.max_connections,
         "connection pool ready"
      );

      Ok(pool)
   }

   /// Check a connection out of the pool.
   ///
   /// Suspends only when the pool is at capacity with nothing idle; a queued
   /// checkout fails with [`Error::CheckoutTimeout`] once `checkout_timeout`
   /// elapses. The returned guard releases the connection when dropped, so
   /// release happens on success, error, and cancellation alike.
   pub(crate) async fn acquire(&self) -> Result<PooledConnection<'_>> {
      // Decide what to do while holding the lock, then act without it.
      // `None` means a slot was reserved and a fresh connection must be
      // opened; `Some` carries a queued waiter. Keeping every await outside
      // this block ensures the guard is never held across a suspend point.
      let queued = {
         let mut state = self.lock_state();

         if state.closed {
            return Err(Error::PoolClosed);
         }

         if let Some(conn) = state.idle.pop() {
            state.active += 1;
            trace!(active = state.active, "checkout served from idle list");
            return Ok(PooledConnection::new(self, conn));
         }

         if state.active < self.config.max_connections {
            // Reserve the slot before awaiting so concurrent checkouts
            // cannot overshoot max_connections while this one is opening.
            state.active += 1;
            None
         } else {
            let (tx, rx) = oneshot::channel();
            let waiter_id = state.next_waiter_id;
            state.next_waiter_id += 1;
            state.waiters.push_back(Waiter { id: waiter_id, tx });

            debug!(
               waiting = state.waiters.len(),
               "pool at capacity, queueing checkout"
            );

            Some((waiter_id, rx))
         }
      };

      let (waiter_id, mut rx) = match queued {
         // A slot was reserved above: open a fresh connection outside the
         // lock so the guard is not held across the await.
         None => {
            return match self.open_connection().await {
               Ok(conn) => Ok(PooledConnection::new(self, conn)),
               Err(e) => {
                  self.lock_state().active -= 1;
                  Err(e)
               }
            };
         }
         Some(waiter) => waiter,
      };

      match timeout(self.config.checkout_timeout, &mut rx).await {
         Ok(Ok(conn)) => Ok(PooledConnection::new(self, conn)),

         // Sender dropped without a hand-off: the pool was closed while this
         // checkout was queued.
         Ok(Err(_)) => Err(Error::PoolClosed),

         Err(_) => {
            let mut state = self.lock_state();
            let queued = state.waiters.iter().position(|w| w.id == waiter_id);

            if let Some(index) = queued {
               let _ = state.waiters.remove(index);
               drop(state);
               return Err(Error::CheckoutTimeout {
                  waited_ms: self.config.checkout_timeout.as_millis() as u64,
               });
            }

            // The waiter was dequeued in the same instant the timer fired:
            // a connection is already in the channel (or the pool closed).
            // The hand-off wins over the timeout.
            drop(state);
            match rx.try_recv() {
               Ok(conn) => Ok(PooledConnection::new(self, conn)),
               Err(_) => Err(Error::PoolClosed),
            }
         }
      }
   }

   /// Return a connection to the pool. Infallible: called from guard drops.
   fn release(&self, mut conn: SqliteConnection) {
      let mut state = self.lock_state();
      state.active -= 1;

      // Waiters have priority over the idle list: hand the connection
      // straight to the longest-waiting checkout. A waiter whose receiver
      // is gone already timed out or was cancelled; skip to the next one.
      while let Some(waiter) = state.waiters.pop_front() {
         match waiter.tx.send(conn) {
            Ok(()) => {
               state.active += 1;
               trace!(
                  waiting = state.waiters.len(),
                  "connection handed to queued checkout"
               );
               return;
            }
            Err(returned) => conn = returned,
         }
      }

      if !state.closed && state.idle.len() < self.config.min_connections {
         state.idle.push(conn);
         trace!(idle = state.idle.len(), "connection returned to idle list");
         return;
      }

      drop(state);

      // Above the retained floor (or the pool already closed): shed the
      // connection. Dropping a SqliteConnection shuts the handle down on
      // its worker thread; close() is the graceful, awaited path.
      trace!("shedding connection above the idle floor");
      drop(conn);
   }

   /// Close the pool.
   ///
   /// Queued checkouts fail with [`Error::PoolClosed`] and idle connections
   /// are closed gracefully. Connections still on loan are not reclaimed:
   /// callers must release everything before shutting the pool down. A
   /// connection released after close is shed rather than idled.
   pub async fn close(&self) {
      let (idle, waiters, active) = {
         let mut state = self.lock_state();
         state.closed = true;
         (
            std::mem::take(&mut state.idle),
            std::mem::take(&mut state.waiters),
            state.active,
         )
      };

      if active > 0 {
         warn!(active, "closing pool with connections still on loan");
      }

      // Dropping the senders fails every queued checkout.
      drop(waiters);

      for conn in idle {
         if let Err(e) = conn.close().await {
            warn!(error = %e, "failed to close idle connection");
         }
      }

      debug!("connection pool closed");
   }

   /// Read-only snapshot of pool occupancy.
   pub fn stats(&self) -> PoolStats {
      let state = self.lock_state();
      PoolStats {
         idle_count: state.idle.len(),
         active_count: state.active,
         waiting_count: state.waiters.len(),
         max_connections: self.config.max_connections,
      }
   }

   /// Open a connection with the pool's uniform pragma set.
   async fn open_connection(&self) -> Result<SqliteConnection> {
      let options = SqliteConnectOptions::new()
         .filename(&self.path)
         .create_if_missing(true)
         .journal_mode(SqliteJournalMode::Wal)
         .synchronous(SqliteSynchronous::Normal)
         .foreign_keys(true)
         .busy_timeout(Duration::from_secs(5))
         .pragma("cache_size", "-64000")
         .pragma("temp_store", "memory");

      let conn = options.connect().await.map_err(Error::Connect)?;
      trace!(path = %self.path.display(), "opened SQLite connection");
      Ok(conn)
   }

   fn lock_state(&self) -> MutexGuard<'_, PoolState> {
      self.state.lock().expect("pool state lock poisoned")
   }
}

/// Read-only snapshot of pool occupancy returned by
/// [`ConnectionPool::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
   /// Connections held by the pool, not on loan
   pub idle_count: usize,
   /// Connections currently on loan
   pub active_count: usize,
   /// Checkouts queued because the pool was at capacity
   pub waiting_count: usize,
   /// Configured connection ceiling
   pub max_connections: usize,
}

/// RAII guard for a checked-out connection.
///
/// Dropping the guard returns the connection to the pool: to the oldest
/// waiter if any checkout is queued, to the idle list below the retained
/// floor, or shed otherwise.
#[must_use = "if unused, the connection is immediately returned to the pool"]
pub(crate) struct PooledConnection<'a> {
   pool: &'a ConnectionPool,
   conn: Option<SqliteConnection>,
}

impl<'a> PooledConnection<'a> {
   fn new(pool: &'a ConnectionPool, conn: SqliteConnection) -> Self {
      Self {
         pool,
         conn: Some(conn),
      }
   }
}

impl Deref for PooledConnection<'_> {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      self.conn.as_ref().expect("connection already released")
   }
}

impl DerefMut for PooledConnection<'_> {
   fn deref_mut(&mut self) -> &mut Self::Target {
      self.conn.as_mut().expect("connection already released")
   }
}

impl Drop for PooledConnection<'_> {
   fn drop(&mut self) {
      if let Some(conn) = self.conn.take() {
         self.pool.release(conn);
      }
   }
}

impl std::fmt::Debug for PooledConnection<'_> {
   // `SqliteConnection` is not `Debug`, so report liveness rather than the
   // wrapped handle. Present so `Result::unwrap_err` can format the Ok side.
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("PooledConnection")
         .field("released", &self.conn.is_none())
         .finish_non_exhaustive()
   }
}
