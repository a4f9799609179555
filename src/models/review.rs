use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A review record as returned by the reviews API.
///
/// Timestamps are deserialized leniently: the server has emitted both
/// epoch-milliseconds and RFC 3339 strings across versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    /// Star rating, 1-5.
    pub rating: u8,
    pub comments: String,
    #[serde(
        default,
        alias = "createdAt",
        deserialize_with = "loose_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "updatedAt",
        deserialize_with = "loose_timestamp"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for submitting a new review. The server assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub restaurant_id: i64,
    pub name: String,
    pub rating: u8,
    pub comments: String,
}

/// Accept epoch milliseconds, an RFC 3339 string, or null.
fn loose_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Millis(ms)) => Ok(Utc.timestamp_millis_opt(ms).single()),
        Some(Raw::Text(s)) => Ok(DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))),
    }
}
