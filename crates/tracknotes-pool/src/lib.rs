//! # tracknotes-pool
//!
//! A bounded SQLite connection pool for the Tracknotes data layer.
//!
//! ## Core Types
//!
//! - **[`ConnectionPool`]**: The pool itself; owns every connection to the
//!   database file and hands them out one caller at a time
//! - **[`PoolConfig`]**: Pool sizing and checkout-timeout configuration
//! - **[`PoolStats`]**: Read-only snapshot of pool occupancy
//! - **[`Error`]**: Error type for pool and query operations
//!
//! ## Architecture
//!
//! - **Bounded checkout**: at most `max_connections` connections exist at any
//!   time; callers past capacity queue in FIFO order behind a timeout
//! - **Direct hand-off**: a released connection goes to the longest-waiting
//!   queued caller before it is ever considered for the idle list
//! - **Idle floor**: released connections above `min_connections` are shed
//!   rather than retained
//! - **Sanctioned surface**: external callers use [`ConnectionPool::fetch_all`],
//!   [`ConnectionPool::fetch_one`], [`ConnectionPool::execute`], and
//!   [`ConnectionPool::execute_batch`]; raw connection handles never leave
//!   this crate
//!
//! The pool is the single point of access to the database file: connections
//! are configured with a uniform pragma set (WAL journal, NORMAL synchronous,
//! in-memory temp store) at open time, so opening a side channel to the same
//! file would undermine those guarantees.

mod config;
mod decode;
mod error;
mod pool;
mod queries;

pub use config::PoolConfig;
pub use error::{Error, Result};
pub use pool::{ConnectionPool, PoolStats};
pub use queries::{ChangeInfo, SqlRow};
