//! # tracknotes-cache
//!
//! An in-memory cache with per-entry time-to-live, used to keep hot listing
//! queries (forum threads, review feeds) off the database.
//!
//! ## Core Types
//!
//! - **[`TtlCache`]**: The cache map: `get`/`set` with per-entry TTL, lazy
//!   expiry, and prefix invalidation
//! - **[`CacheKey`]**: Builder for the dash-joined key convention shared by
//!   lookups and invalidation prefixes
//!
//! ## Semantics
//!
//! - An entry past its TTL is never returned: a lookup that finds one removes
//!   it and reports a miss
//! - `invalidate(prefix)` clears a whole family of keys at once, so one call
//!   after a write covers every paginated/filtered variant of a listing
//! - Operations never suspend and never fail; the only caller-visible
//!   condition is hit vs. miss
//!
//! The cache is process-local: replicas each hold an independent map with no
//! cross-process coherence. That is acceptable as long as the writes that
//! invalidate a listing happen in the same process that cached it; otherwise
//! staleness is bounded only by the TTL.
//!
//! Capacity is unbounded. The expected workload is a small number of distinct
//! hot keys; revisit with an eviction policy before pointing this at an
//! unbounded key space.

mod cache;
mod key;

pub use cache::TtlCache;
pub use key::CacheKey;
