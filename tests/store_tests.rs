//! End-to-end tests for the DataStore facade: the cache-aside read path,
//! write-then-invalidate, and lifecycle behavior handlers rely on.

use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use tracknotes_data::{CacheKey, DataStore, Error};

const LISTING_TTL: Duration = Duration::from_secs(300);

const THREADS_BY_CATEGORY: &str =
   "SELECT id, title FROM threads WHERE category = $1 ORDER BY id LIMIT $2 OFFSET $3";

async fn forum_store() -> (DataStore, TempDir) {
   let temp_dir = TempDir::new().expect("failed to create temp directory");
   let store = DataStore::connect(temp_dir.path().join("forum.db"), None)
      .await
      .expect("failed to connect store");

   store
      .execute(
         "CREATE TABLE threads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            category TEXT NOT NULL
         )",
         vec![],
      )
      .await
      .unwrap();

   for (title, category) in [
      ("best opening tracks", "general"),
      ("vinyl vs. streaming", "general"),
      ("site feedback", "meta"),
   ] {
      store
         .execute(
            "INSERT INTO threads (title, category) VALUES ($1, $2)",
            vec![json!(title), json!(category)],
         )
         .await
         .unwrap();
   }

   (store, temp_dir)
}

fn general_page_key() -> String {
   CacheKey::new("threads")
      .part("general")
      .part(20)
      .part(0)
      .build()
}

#[tokio::test]
async fn test_repeated_listing_request_is_served_from_cache() {
   let (store, _temp) = forum_store().await;
   let key = general_page_key();

   let first = store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(first.len(), 2);

   // A new thread lands without an invalidation call
   store
      .execute(
         "INSERT INTO threads (title, category) VALUES ($1, $2)",
         vec![json!("underrated b-sides"), json!("general")],
      )
      .await
      .unwrap();

   // Identical request within the TTL window: still the cached two rows,
   // so no query ran against the table
   let second = store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(second.len(), 2);

   // After invalidation the next request re-queries and sees the new thread
   store.invalidate("threads");
   let third = store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(third.len(), 3);
}

#[tokio::test]
async fn test_invalidation_only_clears_the_named_family() {
   let (store, _temp) = forum_store().await;

   let threads_key = general_page_key();
   store
      .fetch_all_cached(&threads_key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();

   let categories_key = "forum-categories";
   store
      .fetch_all_cached(
         categories_key,
         LISTING_TTL,
         "SELECT DISTINCT category FROM threads ORDER BY category",
         vec![],
      )
      .await
      .unwrap();

   store
      .execute(
         "INSERT INTO threads (title, category) VALUES ($1, $2)",
         vec![json!("fresh thread"), json!("general")],
      )
      .await
      .unwrap();
   let removed = store.invalidate("threads");
   assert_eq!(removed, 1);

   // The threads family re-queries and sees the write
   let threads = store
      .fetch_all_cached(&threads_key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(threads.len(), 3);

   // The categories family was untouched and still serves its cached value
   assert!(store.cache().get(categories_key).is_some());
}

#[tokio::test]
async fn test_expired_listing_is_re_queried() {
   let (store, _temp) = forum_store().await;
   let key = general_page_key();
   let short_ttl = Duration::from_millis(40);

   let first = store
      .fetch_all_cached(&key, short_ttl, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(first.len(), 2);

   store
      .execute(
         "INSERT INTO threads (title, category) VALUES ($1, $2)",
         vec![json!("late addition"), json!("general")],
      )
      .await
      .unwrap();

   // Past the TTL the cached listing behaves like a miss
   tokio::time::sleep(Duration::from_millis(100)).await;
   let second = store
      .fetch_all_cached(&key, short_ttl, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(second.len(), 3);
}

#[tokio::test]
async fn test_uncached_reads_and_writes_pass_through() {
   let (store, _temp) = forum_store().await;

   let row = store
      .fetch_one(
         "SELECT title FROM threads WHERE category = $1 ORDER BY id",
         vec![json!("meta")],
      )
      .await
      .unwrap()
      .unwrap();
   assert_eq!(row.get("title"), Some(&json!("site feedback")));

   let info = store
      .execute("DELETE FROM threads WHERE category = $1", vec![json!("meta")])
      .await
      .unwrap();
   assert_eq!(info.rows_affected, 1);

   let rows = store.fetch_all("SELECT * FROM threads", vec![]).await.unwrap();
   assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_batch_write_then_invalidate() {
   let (store, _temp) = forum_store().await;
   let key = general_page_key();

   store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();

   // A thread plus its first post, atomically, then the listing invalidation
   // the consumer contract requires after the write
   let results = store
      .execute_batch(vec![
         (
            "INSERT INTO threads (title, category) VALUES ($1, $2)".into(),
            vec![json!("album of the year so far"), json!("general")],
         ),
         (
            "UPDATE threads SET title = $1 WHERE title = $2".into(),
            vec![json!("AOTY so far"), json!("album of the year so far")],
         ),
      ])
      .await
      .unwrap();
   assert_eq!(results.len(), 2);
   store.invalidate("threads");

   let listing = store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(listing.len(), 3);

   // No connections leaked along the way
   let stats = store.stats();
   assert_eq!(stats.active_count, 0);
   assert_eq!(stats.waiting_count, 0);
}

#[tokio::test]
async fn test_close_stops_queries_but_cached_entries_still_serve() {
   let (store, _temp) = forum_store().await;
   let key = general_page_key();

   store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();

   store.close().await;

   // The pool refuses new work
   let err = store.fetch_all("SELECT 1", vec![]).await.unwrap_err();
   assert!(matches!(err, Error::PoolClosed));

   // The cache fast path is still consulted first, so the cached listing
   // survives until its TTL
   let cached = store
      .fetch_all_cached(&key, LISTING_TTL, THREADS_BY_CATEGORY, vec![
         json!("general"),
         json!(20),
         json!(0),
      ])
      .await
      .unwrap();
   assert_eq!(cached.len(), 2);
}
