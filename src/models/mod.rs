//! Data models for the restaurant listings service.
//!
//! This module contains the data structures mirrored from the remote API:
//!
//! - `Restaurant`: listing entry with location, hours, and favorite flag
//! - `Review`, `NewReview`: per-restaurant reviews and the submission body

pub mod restaurant;
pub mod review;

pub use restaurant::{LatLng, Restaurant};
pub use review::{NewReview, Review};
