//! The local cache core: a persistent, indexed, TTL-gated mirror of the
//! remote restaurant and review collections.
//!
//! - `LocalCache`: the public read/write surface
//! - `RestaurantIndex`: secondary lookups over a committed snapshot
//! - `RefreshLocks`: single-flight coordination for in-flight refreshes

pub mod flight;
pub mod index;
pub mod local;

use thiserror::Error;

pub use local::{CacheOptions, LocalCache, FILTER_ALL};

/// Errors surfaced to callers of the cache API.
///
/// Transient remote failures during a refresh are absorbed inside the cache
/// (logged, local data served) and never appear here; `Remote` only occurs on
/// the write paths, where the caller must know the submission did not land.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: &'static str, id: i64 },

    #[error("Local store unavailable: {0}")]
    Store(anyhow::Error),

    #[error("Remote write failed: {0}")]
    Remote(#[from] crate::api::ApiError),
}

impl From<anyhow::Error> for CacheError {
    fn from(err: anyhow::Error) -> Self {
        CacheError::Store(err)
    }
}
