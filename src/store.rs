//! The store facade handlers are given: one pool, one cache

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::debug;
use tracknotes_cache::TtlCache;
use tracknotes_pool::{ChangeInfo, ConnectionPool, PoolConfig, PoolStats, SqlRow};

use crate::Result;

/// A cached result set.
///
/// Shared between callers by reference count, so repeated cache hits hand
/// out the same rows without copying; treat them as read-only.
pub type CachedRows = Arc<Vec<SqlRow>>;

/// Data-access entry point for a single database file.
///
/// Owns one [`ConnectionPool`] and one [`TtlCache`]. Reads and writes go
/// through the pool; hot listings additionally go through
/// [`fetch_all_cached`](Self::fetch_all_cached), with write paths calling
/// [`invalidate`](Self::invalidate) to keep cached listings honest.
pub struct DataStore {
   pool: ConnectionPool,
   cache: TtlCache<CachedRows>,
}

impl DataStore {
   /// Open the store for the database file at `path`.
   ///
   /// Pass `None` to use the default pool sizing, or a [`PoolConfig`] to
   /// override it (e.g. from [`PoolConfig::from_env`]).
   pub async fn connect(path: impl AsRef<Path>, config: Option<PoolConfig>) -> Result<Self> {
      let pool = ConnectionPool::connect(path, config.unwrap_or_default()).await?;

      Ok(Self {
         pool,
         cache: TtlCache::new(),
      })
   }

   /// Run a SELECT and return every matching row.
   pub async fn fetch_all(&self, query: &str, values: Vec<JsonValue>) -> Result<Vec<SqlRow>> {
      self.pool.fetch_all(query, values).await
   }

   /// Run a SELECT expected to match at most one row.
   pub async fn fetch_one(&self, query: &str, values: Vec<JsonValue>) -> Result<Option<SqlRow>> {
      self.pool.fetch_one(query, values).await
   }

   /// Run a single write statement.
   ///
   /// If the write makes any cached listing stale, follow up with
   /// [`invalidate`](Self::invalidate) on that listing's key family.
   pub async fn execute(&self, query: &str, values: Vec<JsonValue>) -> Result<ChangeInfo> {
      self.pool.execute(query, values).await
   }

   /// Execute multiple write statements atomically.
   pub async fn execute_batch(
      &self,
      statements: Vec<(String, Vec<JsonValue>)>,
   ) -> Result<Vec<ChangeInfo>> {
      self.pool.execute_batch(statements).await
   }

   /// Cache-aside read for hot, rarely-changing listings.
   ///
   /// Serves `key` from the cache when a fresh entry exists; otherwise runs
   /// the query and stores the result under `key` for `ttl`. Key families
   /// follow the [`CacheKey`](tracknotes_cache::CacheKey) convention so a
   /// single invalidation covers every variant of a listing.
   pub async fn fetch_all_cached(
      &self,
      key: &str,
      ttl: Duration,
      query: &str,
      values: Vec<JsonValue>,
   ) -> Result<CachedRows> {
      if let Some(rows) = self.cache.get(key) {
         debug!(key, "listing served from cache");
         return Ok(rows);
      }

      let rows: CachedRows = Arc::new(self.pool.fetch_all(query, values).await?);
      self.cache.set(key, Arc::clone(&rows), ttl);
      debug!(key, rows = rows.len(), "listing cached");

      Ok(rows)
   }

   /// Remove every cached listing whose key equals or starts with `prefix`.
   ///
   /// Call immediately after any write that affects those listings. Returns
   /// the number of entries removed.
   pub fn invalidate(&self, prefix: &str) -> usize {
      self.cache.invalidate(prefix)
   }

   /// Direct access to the query cache, for entries that don't come from
   /// [`fetch_all_cached`](Self::fetch_all_cached).
   pub fn cache(&self) -> &TtlCache<CachedRows> {
      &self.cache
   }

   /// Pool occupancy snapshot.
   pub fn stats(&self) -> PoolStats {
      self.pool.stats()
   }

   /// Close the pool.
   ///
   /// All checked-out connections must have been released first; queued
   /// checkouts fail and idle connections are closed. The cache is dropped
   /// with the store; it is never persisted.
   pub async fn close(&self) {
      self.pool.close().await;
   }
}
