//! Persistent local storage for offline data access.
//!
//! This module owns the on-disk mirror of the remote collections. Each
//! collection is a single JSON snapshot file stamped with its last sync time;
//! reviews are stored one file per restaurant. Snapshot replacement is
//! atomic, and the layout is versioned with additive migrations.

pub mod disk;
pub mod schema;

pub use disk::{LocalStore, Snapshot};
