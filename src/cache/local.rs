use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::{ApiClient, DEFAULT_BASE_URL};
use crate::models::{NewReview, Restaurant, Review};
use crate::store::LocalStore;

use super::flight::{RefreshKey, RefreshLocks};
use super::index::RestaurantIndex;
use super::CacheError;

// ============================================================================
// Constants
// ============================================================================

/// Consider a collection stale after 1 hour.
/// Balances freshness with reducing unnecessary API calls for slowly-changing data.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Upper bound on waiting for another caller's in-flight refresh.
/// Slightly above the HTTP timeout so a healthy refresh always finishes first.
pub const DEFAULT_REFRESH_WAIT: Duration = Duration::from_secs(45);

/// Wildcard value accepted by `restaurants_filtered` for either field.
pub const FILTER_ALL: &str = "all";

/// Runtime knobs for opening a `LocalCache`.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub ttl: Duration,
    pub refresh_wait: Duration,
}

impl CacheOptions {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir,
            ttl: DEFAULT_TTL,
            refresh_wait: DEFAULT_REFRESH_WAIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// One committed restaurant snapshot: records, their indexes, and the sync
/// time the TTL is measured from. Replaced as a unit, so a reader holding an
/// `Arc` to it can never observe a half-updated collection.
struct RestaurantTable {
    records: Vec<Restaurant>,
    index: RestaurantIndex,
    synced_at: DateTime<Utc>,
}

impl RestaurantTable {
    fn new(records: Vec<Restaurant>, synced_at: DateTime<Utc>) -> Self {
        let index = RestaurantIndex::build(&records);
        Self {
            records,
            index,
            synced_at,
        }
    }
}

/// One restaurant's review snapshot with its own sync time.
struct ReviewTable {
    records: Vec<Review>,
    synced_at: DateTime<Utc>,
}

fn is_fresh(synced_at: DateTime<Utc>, ttl: Duration) -> bool {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    Utc::now() - synced_at < ttl
}

/// Persistent, indexed, TTL-gated mirror of the remote restaurant and review
/// collections.
///
/// Reads are answered from the in-memory snapshot after a freshness check;
/// the disk copy makes the data survive restarts and network outages. There
/// is no global instance: callers construct one and pass it by reference.
pub struct LocalCache {
    api: ApiClient,
    store: LocalStore,
    ttl: Duration,
    refresh_wait: Duration,
    restaurants: RwLock<Option<Arc<RestaurantTable>>>,
    reviews: RwLock<HashMap<i64, Arc<ReviewTable>>>,
    locks: RefreshLocks,
}

impl LocalCache {
    /// Open the cache, creating/migrating the on-disk store and hydrating any
    /// persisted restaurant snapshot. No network traffic happens here.
    pub fn open(options: CacheOptions) -> Result<Self, CacheError> {
        let api = ApiClient::new(options.base_url)?;
        let store = LocalStore::open(options.cache_dir)?;

        let restaurants = store
            .load_restaurants()?
            .map(|snapshot| Arc::new(RestaurantTable::new(snapshot.data, snapshot.synced_at)));

        Ok(Self {
            api,
            store,
            ttl: options.ttl,
            refresh_wait: options.refresh_wait,
            restaurants: RwLock::new(restaurants),
            reviews: RwLock::new(HashMap::new()),
            locks: RefreshLocks::default(),
        })
    }

    // ===== Freshness-gated refresh =====

    async fn restaurants_fresh(&self) -> bool {
        match &*self.restaurants.read().await {
            Some(table) => is_fresh(table.synced_at, self.ttl),
            None => false,
        }
    }

    /// Make sure the restaurant collection is no older than the TTL.
    ///
    /// Concurrent callers single-flight on the collection's refresh lock:
    /// one fetches, the rest park and then find the data fresh. A fetch
    /// failure is absorbed - existing local data keeps serving and the sync
    /// time is left untouched so the next read retries the network.
    async fn ensure_fresh_restaurants(&self) -> Result<(), CacheError> {
        if self.restaurants_fresh().await {
            return Ok(());
        }

        let Some(_guard) = self
            .locks
            .acquire_timeout(RefreshKey::Restaurants, self.refresh_wait)
            .await
        else {
            warn!("Timed out waiting for in-flight restaurant refresh, serving local data");
            return Ok(());
        };

        // A parked waiter usually finds the holder already committed.
        if self.restaurants_fresh().await {
            return Ok(());
        }

        let started_at = Utc::now();
        match self.api.fetch_restaurants().await {
            Ok(records) => {
                self.store.save_restaurants(&records, started_at)?;
                let table = Arc::new(RestaurantTable::new(records, started_at));
                *self.restaurants.write().await = Some(table);
                debug!("Refreshed restaurant collection");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Restaurant refresh failed, serving stale local data");
                Ok(())
            }
        }
    }

    async fn reviews_fresh(&self, restaurant_id: i64) -> bool {
        match self.reviews.read().await.get(&restaurant_id) {
            Some(table) => is_fresh(table.synced_at, self.ttl),
            None => false,
        }
    }

    /// Like `ensure_fresh_restaurants`, but freshness is tracked per
    /// restaurant id: restaurant A's reviews never affect restaurant B's.
    async fn ensure_fresh_reviews(&self, restaurant_id: i64) -> Result<(), CacheError> {
        if self.reviews_fresh(restaurant_id).await {
            return Ok(());
        }

        let key = RefreshKey::Reviews(restaurant_id);
        let Some(_guard) = self.locks.acquire_timeout(key, self.refresh_wait).await else {
            warn!(restaurant_id, "Timed out waiting for in-flight review refresh, serving local data");
            return Ok(());
        };

        // Hydrate lazily from disk before deciding whether the network is due.
        if self.reviews.read().await.get(&restaurant_id).is_none() {
            if let Some(snapshot) = self.store.load_reviews(restaurant_id)? {
                self.reviews.write().await.insert(
                    restaurant_id,
                    Arc::new(ReviewTable {
                        records: snapshot.data,
                        synced_at: snapshot.synced_at,
                    }),
                );
            }
        }

        if self.reviews_fresh(restaurant_id).await {
            return Ok(());
        }

        let started_at = Utc::now();
        match self.api.fetch_reviews(restaurant_id).await {
            Ok(records) => {
                self.store.save_reviews(restaurant_id, &records, started_at)?;
                self.reviews.write().await.insert(
                    restaurant_id,
                    Arc::new(ReviewTable {
                        records,
                        synced_at: started_at,
                    }),
                );
                debug!(restaurant_id, "Refreshed review collection");
                Ok(())
            }
            Err(e) => {
                warn!(restaurant_id, error = %e, "Review refresh failed, serving stale local data");
                Ok(())
            }
        }
    }

    async fn restaurant_table(&self) -> Option<Arc<RestaurantTable>> {
        self.restaurants.read().await.clone()
    }

    // ===== Read accessors =====

    /// The full restaurant collection.
    pub async fn restaurants(&self) -> Result<Vec<Restaurant>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        Ok(self
            .restaurant_table()
            .await
            .map(|t| t.records.clone())
            .unwrap_or_default())
    }

    /// A single restaurant, or None when no such id exists.
    pub async fn restaurant_by_id(&self, id: i64) -> Result<Option<Restaurant>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        let Some(table) = self.restaurant_table().await else {
            return Ok(None);
        };
        Ok(table.index.position(id).map(|pos| table.records[pos].clone()))
    }

    pub async fn restaurants_by_cuisine(
        &self,
        cuisine: &str,
    ) -> Result<Vec<Restaurant>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        let Some(table) = self.restaurant_table().await else {
            return Ok(Vec::new());
        };
        Ok(collect_positions(&table.records, table.index.cuisine_positions(cuisine)))
    }

    pub async fn restaurants_by_neighborhood(
        &self,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        let Some(table) = self.restaurant_table().await else {
            return Ok(Vec::new());
        };
        Ok(collect_positions(
            &table.records,
            table.index.neighborhood_positions(neighborhood),
        ))
    }

    /// Exact match on the (cuisine_type, neighborhood) pair.
    pub async fn restaurants_by_cuisine_and_neighborhood(
        &self,
        cuisine: &str,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        let Some(table) = self.restaurant_table().await else {
            return Ok(Vec::new());
        };
        Ok(collect_positions(
            &table.records,
            table.index.compound_positions(cuisine, neighborhood),
        ))
    }

    /// Filter composite used by the listings page: either field may be the
    /// wildcard "all".
    pub async fn restaurants_filtered(
        &self,
        cuisine: &str,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, CacheError> {
        match (cuisine == FILTER_ALL, neighborhood == FILTER_ALL) {
            (true, true) => self.restaurants().await,
            (false, true) => self.restaurants_by_cuisine(cuisine).await,
            (true, false) => self.restaurants_by_neighborhood(neighborhood).await,
            (false, false) => {
                self.restaurants_by_cuisine_and_neighborhood(cuisine, neighborhood)
                    .await
            }
        }
    }

    /// Distinct cuisine values, first-seen order (filter dropdown source).
    pub async fn cuisines(&self) -> Result<Vec<String>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        Ok(self
            .restaurant_table()
            .await
            .map(|t| t.index.cuisines().to_vec())
            .unwrap_or_default())
    }

    /// Distinct neighborhood values, first-seen order.
    pub async fn neighborhoods(&self) -> Result<Vec<String>, CacheError> {
        self.ensure_fresh_restaurants().await?;
        Ok(self
            .restaurant_table()
            .await
            .map(|t| t.index.neighborhoods().to_vec())
            .unwrap_or_default())
    }

    /// All reviews for one restaurant, freshness-gated per restaurant id.
    pub async fn reviews_for(&self, restaurant_id: i64) -> Result<Vec<Review>, CacheError> {
        self.ensure_fresh_reviews(restaurant_id).await?;
        Ok(self
            .reviews
            .read()
            .await
            .get(&restaurant_id)
            .map(|t| t.records.clone())
            .unwrap_or_default())
    }

    // ===== Write accessors =====

    /// Flip a restaurant's favorite flag.
    ///
    /// The flag is persisted locally first and the new value returned right
    /// away; the server is notified in the background. A rejected remote
    /// update is logged and not rolled back - the next TTL-expired refresh
    /// converges on the server's value.
    pub async fn toggle_favorite(&self, id: i64) -> Result<bool, CacheError> {
        // Take the collection's refresh lock so the read-modify-write cannot
        // interleave with a refresh commit.
        let _guard = self.locks.acquire(RefreshKey::Restaurants).await;

        let (records, synced_at, new_value) = {
            let guard = self.restaurants.read().await;
            let Some(table) = guard.as_ref() else {
                return Err(CacheError::NotFound {
                    collection: "restaurants",
                    id,
                });
            };
            let Some(pos) = table.index.position(id) else {
                return Err(CacheError::NotFound {
                    collection: "restaurants",
                    id,
                });
            };

            let mut records = table.records.clone();
            records[pos].is_favorite = !records[pos].is_favorite;
            let new_value = records[pos].is_favorite;
            (records, table.synced_at, new_value)
        };

        // Persist with the original sync time: a local mutation must not
        // extend the freshness window.
        self.store.save_restaurants(&records, synced_at)?;
        *self.restaurants.write().await = Some(Arc::new(RestaurantTable::new(records, synced_at)));

        let api = self.api.clone();
        let value = new_value;
        tokio::spawn(async move {
            if let Err(e) = api.set_favorite(id, value).await {
                warn!(restaurant_id = id, error = %e, "Failed to push favorite flag to server");
            }
        });

        Ok(new_value)
    }

    /// Submit a new review.
    ///
    /// The review goes to the server first; only the acknowledged record
    /// (with its server-assigned id and timestamps) is written locally. A
    /// remote failure surfaces to the caller and leaves the store untouched.
    pub async fn add_review(&self, review: &NewReview) -> Result<Review, CacheError> {
        let created = self.api.create_review(review).await?;
        let restaurant_id = created.restaurant_id;

        let _guard = self.locks.acquire(RefreshKey::Reviews(restaurant_id)).await;

        let mut reviews = self.reviews.write().await;
        let existing = match reviews.get(&restaurant_id) {
            Some(table) => Some((table.records.clone(), table.synced_at)),
            None => self
                .store
                .load_reviews(restaurant_id)?
                .map(|s| (s.data, s.synced_at)),
        };

        // Only append to a complete snapshot. With no local snapshot yet,
        // the next read fetches the full set (including this review) anyway.
        if let Some((mut records, synced_at)) = existing {
            records.push(created.clone());
            self.store.save_reviews(restaurant_id, &records, synced_at)?;
            reviews.insert(
                restaurant_id,
                Arc::new(ReviewTable { records, synced_at }),
            );
        }

        Ok(created)
    }
}

fn collect_positions(records: &[Restaurant], positions: &[usize]) -> Vec<Restaurant> {
    positions.iter().map(|&pos| records[pos].clone()).collect()
}
