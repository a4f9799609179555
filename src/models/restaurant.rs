use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Geographic position of a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A restaurant record as served by the listings API and mirrored locally.
///
/// `is_favorite` is deserialized leniently: older server versions emit the
/// flag as the strings `"true"`/`"false"` instead of a JSON boolean, and
/// records created before the feature existed omit it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub neighborhood: String,
    pub address: String,
    #[serde(default)]
    pub latlng: LatLng,
    pub cuisine_type: String,
    /// Photo reference without extension, e.g. "3". May be absent.
    #[serde(default)]
    pub photograph: Option<String>,
    /// Day name -> hours string, e.g. "Monday" -> "11:30 am - 11:00 pm"
    #[serde(default)]
    pub operating_hours: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub is_favorite: bool,
}

impl Restaurant {
    /// Photo reference to use for image URLs, falling back to the record id
    /// when the server did not supply one.
    pub fn photograph_ref(&self) -> String {
        self.photograph
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Accept `true`, `"true"`, `false`, `"false"`, or null.
fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Raw::Bool(b)) => Ok(b),
        Some(Raw::Text(s)) => Ok(s.eq_ignore_ascii_case("true")),
    }
}
