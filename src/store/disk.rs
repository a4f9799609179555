use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{Restaurant, Review};

use super::schema;

/// A complete collection snapshot together with its last successful sync time.
///
/// The sync time is the freshness record: reads compare it against the TTL to
/// decide whether a remote refresh is due. A local mutation that re-persists
/// the snapshot must carry the original sync time forward so it does not
/// extend the freshness window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub data: T,
    pub synced_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            synced_at: Utc::now(),
        }
    }

    pub fn with_synced_at(data: T, synced_at: DateTime<Utc>) -> Self {
        Self { data, synced_at }
    }

    /// Whether the snapshot has outlived the given TTL.
    pub fn is_stale(&self, ttl: StdDuration) -> bool {
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        Utc::now() - self.synced_at >= ttl
    }
}

/// Persistent local store: one JSON snapshot file per collection under a
/// cache root, with per-restaurant review files under `reviews/`.
///
/// Writes are atomic (temp file + rename), so a concurrent reader observes
/// either the previous snapshot or the new one, never a torn file. The cache
/// owns this directory exclusively; nothing else writes to it.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (creating and migrating if needed) the store at `root`.
    pub fn open(root: PathBuf) -> Result<Self> {
        schema::migrate(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn restaurants_path(&self) -> PathBuf {
        self.root.join("restaurants.json")
    }

    fn reviews_path(&self, restaurant_id: i64) -> PathBuf {
        self.root
            .join(schema::REVIEWS_DIR)
            .join(format!("{}.json", restaurant_id))
    }

    fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<Snapshot<T>>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

        let snapshot: Snapshot<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;

        Ok(Some(snapshot))
    }

    /// Replace the file at `path` with a new snapshot in one atomic step.
    fn save<T: Serialize>(&self, path: &Path, snapshot: &Snapshot<T>) -> Result<()> {
        let contents = serde_json::to_string_pretty(snapshot)?;

        // Same-directory temp file so the rename stays on one filesystem.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to commit cache file: {}", path.display()))?;
        Ok(())
    }

    // ===== Restaurants =====

    pub fn load_restaurants(&self) -> Result<Option<Snapshot<Vec<Restaurant>>>> {
        self.load(&self.restaurants_path())
    }

    pub fn save_restaurants(
        &self,
        restaurants: &[Restaurant],
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let snapshot = Snapshot::with_synced_at(restaurants.to_vec(), synced_at);
        self.save(&self.restaurants_path(), &snapshot)
    }

    // ===== Reviews (keyed per restaurant) =====

    pub fn load_reviews(&self, restaurant_id: i64) -> Result<Option<Snapshot<Vec<Review>>>> {
        self.load(&self.reviews_path(restaurant_id))
    }

    pub fn save_reviews(
        &self,
        restaurant_id: i64,
        reviews: &[Review],
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let snapshot = Snapshot::with_synced_at(reviews.to_vec(), synced_at);
        self.save(&self.reviews_path(restaurant_id), &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(id: i64, name: &str) -> Restaurant {
        Restaurant {
            id,
            name: name.to_string(),
            neighborhood: "Manhattan".to_string(),
            address: "1 Main St".to_string(),
            latlng: Default::default(),
            cuisine_type: "Pizza".to_string(),
            photograph: None,
            operating_hours: Default::default(),
            is_favorite: false,
        }
    }

    #[test]
    fn test_missing_collection_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path().to_path_buf()).expect("open");
        assert!(store.load_restaurants().expect("load").is_none());
        assert!(store.load_reviews(7).expect("load").is_none());
    }

    #[test]
    fn test_restaurants_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path().to_path_buf()).expect("open");

        let records = vec![restaurant(1, "Emily"), restaurant(2, "Roberta's")];
        let synced_at = Utc::now();
        store.save_restaurants(&records, synced_at).expect("save");

        let snapshot = store
            .load_restaurants()
            .expect("load")
            .expect("snapshot present");
        assert_eq!(snapshot.data, records);
        assert_eq!(snapshot.synced_at, synced_at);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path().to_path_buf()).expect("open");
        store
            .save_restaurants(&[restaurant(1, "Emily")], Utc::now())
            .expect("save");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_reviews_keyed_per_restaurant() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path().to_path_buf()).expect("open");

        let review = Review {
            id: 1,
            restaurant_id: 7,
            name: "Alice".to_string(),
            rating: 5,
            comments: "Great!".to_string(),
            created_at: None,
            updated_at: None,
        };
        store.save_reviews(7, &[review.clone()], Utc::now()).expect("save");

        let loaded = store.load_reviews(7).expect("load").expect("present");
        assert_eq!(loaded.data, vec![review]);
        // A different restaurant's collection stays independent.
        assert!(store.load_reviews(8).expect("load").is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path().to_path_buf()).expect("open");
        fs::write(dir.path().join("restaurants.json"), "not json").expect("write");
        assert!(store.load_restaurants().is_err());
    }

    #[test]
    fn test_snapshot_staleness() {
        let fresh = Snapshot::new(vec![1]);
        assert!(!fresh.is_stale(StdDuration::from_secs(60)));

        let mut old = Snapshot::new(vec![1]);
        old.synced_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale(StdDuration::from_secs(3600)));
        assert!(!old.is_stale(StdDuration::from_secs(7200)));
    }
}
