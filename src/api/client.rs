//! HTTP client for the restaurant listings REST API.
//!
//! This module provides the `ApiClient` struct for fetching restaurant and
//! review data and for relaying locally-originated writes (favorite toggles,
//! new reviews) to the server.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{NewReview, Restaurant, Review};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the listings API during local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1337";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the restaurant listings service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should
    /// retry), or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            // Rate limited - signal to retry
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request (built by `build`), retrying on 429 with exponential
    /// backoff, and return the successful response.
    async fn send_with_backoff(
        &self,
        url: &str,
        build: impl Fn(&Client) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build(&self.client).send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send_with_backoff(url, |c| c.get(url)).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e))
        })
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send_with_backoff(url, |c| c.post(url).json(body)).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e))
        })
    }

    // ===== Data Fetching Methods =====

    /// Fetch the full restaurant collection.
    pub async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        let url = format!("{}/restaurants", self.base_url);
        debug!(url = %url, "Fetching restaurants");
        self.get_json(&url).await
    }

    /// Fetch all reviews for one restaurant.
    pub async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError> {
        let url = format!(
            "{}/reviews?restaurant_id={}",
            self.base_url, restaurant_id
        );
        debug!(url = %url, "Fetching reviews");
        self.get_json(&url).await
    }

    // ===== Write Methods =====

    /// Tell the server about a new favorite-flag value.
    /// The response body is ignored; only the status matters.
    pub async fn set_favorite(&self, restaurant_id: i64, is_favorite: bool) -> Result<(), ApiError> {
        let url = format!(
            "{}/restaurants/{}?is_favorite={}",
            self.base_url, restaurant_id, is_favorite
        );
        debug!(url = %url, "Updating favorite flag");
        self.send_with_backoff(&url, |c| c.put(&url)).await?;
        Ok(())
    }

    /// Submit a new review. The server assigns the id and timestamps and
    /// returns the created record.
    pub async fn create_review(&self, review: &NewReview) -> Result<Review, ApiError> {
        let url = format!("{}/reviews", self.base_url);
        debug!(url = %url, restaurant_id = review.restaurant_id, "Submitting review");
        self.post_json(&url, review).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:1337/").expect("client");
        assert_eq!(client.base_url(), "http://localhost:1337");
    }

    #[tokio::test]
    async fn test_fetch_restaurants_parses_array() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/restaurants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1,
                    "name": "Mission Chinese Food",
                    "neighborhood": "Manhattan",
                    "address": "171 E Broadway",
                    "cuisine_type": "Asian",
                    "is_favorite": "false"
                }
            ])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let restaurants = client.fetch_restaurants().await.expect("fetch");
        assert_eq!(restaurants.len(), 1);
        assert_eq!(restaurants[0].name, "Mission Chinese Food");
        assert!(!restaurants[0].is_favorite);
    }

    #[tokio::test]
    async fn test_fetch_reviews_passes_restaurant_id() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reviews"))
            .and(query_param("restaurant_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 3,
                    "restaurant_id": 7,
                    "name": "Alice",
                    "rating": 5,
                    "comments": "Great!",
                    "createdAt": 1504095567183i64
                }
            ])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let reviews = client.fetch_reviews(7).await.expect("fetch");
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].name, "Alice");
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/restaurants"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).expect("client");
        let err = client.fetch_restaurants().await.expect_err("should fail");
        assert!(matches!(err, ApiError::ServerError(_)));
    }
}
