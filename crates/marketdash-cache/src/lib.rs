//! # marketdash-cache
//!
//! In-memory TTL cache that keeps serving the last good value when the
//! upstream it fronts is failing.
//!
//! ## Freshness Model
//!
//! ```text
//! set(k, v, ttl)          stored_at + ttl                 purge / eviction
//!      |---- fresh ---------------|---- stale (kept) ------------|
//!   get_fresh = v              get_fresh = None, get = v
//! ```
//!
//! Entries are never dropped just because they went stale; they stay around
//! as a fallback until overwritten, evicted by the capacity bound, or purged
//! by a retention sweep.
//!
//! ## Modules
//!
//! - [`entry`] - A single cached value and its freshness window
//! - [`store`] - The concurrent [`TtlCache`] itself
//! - [`error`] - Error returned when neither upstream nor cache can answer

pub mod entry;
pub mod error;
pub mod store;

pub use entry::CacheEntry;
pub use error::FetchError;
pub use store::{CacheStats, Cached, DEFAULT_MAX_ENTRIES, Freshness, TtlCache};
