//! platecache - offline-first local cache for a restaurant listings site.
//!
//! The crate mirrors two remote collections (restaurants and per-restaurant
//! reviews) into a persistent local store, answers indexed read queries from
//! the mirror, and relays writes back to the server:
//!
//! - reads are TTL-gated: within the staleness window no network call is made
//! - refreshes are single-flighted per collection and commit atomically
//! - a network outage degrades to serving the last good snapshot
//! - favorite toggles apply locally first; review submissions are written
//!   locally only once the server acknowledges them
//!
//! ```no_run
//! use platecache::{CacheOptions, LocalCache};
//!
//! # async fn demo() -> Result<(), platecache::CacheError> {
//! let cache = LocalCache::open(CacheOptions::new("/tmp/platecache".into()))?;
//! let italian = cache.restaurants_filtered("Italian", "all").await?;
//! # let _ = italian;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod store;
pub mod urls;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheError, CacheOptions, LocalCache, FILTER_ALL};
pub use config::Config;
pub use models::{LatLng, NewReview, Restaurant, Review};
