//! # tracknotes-data
//!
//! Data-access layer for the Tracknotes music-review app.
//!
//! Request handlers go through a single [`DataStore`]: reads and writes run
//! on a bounded SQLite connection pool, and hot listing queries (forum
//! threads, review feeds) sit behind an in-memory TTL cache keyed by query
//! shape plus pagination parameters.
//!
//! The store is constructed explicitly at process start and injected into
//! handlers; there is no ambient global instance, which keeps tests on fresh
//! stores and lifecycles in one place.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tracknotes_data::{CacheKey, DataStore};
//!
//! # async fn demo() -> tracknotes_data::Result<()> {
//! let store = DataStore::connect("tracknotes.db", None).await?;
//!
//! // Hot read path: cache-aside with a five-minute freshness window
//! let key = CacheKey::new("threads")
//!    .part("general")
//!    .part(20)
//!    .part(0)
//!    .build();
//! let threads = store
//!    .fetch_all_cached(
//!       &key,
//!       Duration::from_secs(300),
//!       "SELECT * FROM threads WHERE category = $1 ORDER BY bumped_at DESC LIMIT $2 OFFSET $3",
//!       vec!["general".into(), 20.into(), 0.into()],
//!    )
//!    .await?;
//!
//! // Write path: run the statement, then drop the stale listing family
//! store
//!    .execute(
//!       "INSERT INTO threads (title, category) VALUES ($1, $2)",
//!       vec!["first spin: new pressing".into(), "general".into()],
//!    )
//!    .await?;
//! store.invalidate("threads");
//! # let _ = threads;
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{CachedRows, DataStore};
pub use tracknotes_cache::{CacheKey, TtlCache};
pub use tracknotes_pool::{ChangeInfo, Error, PoolConfig, PoolStats, Result, SqlRow};
