//! URL helpers for the presentation layer.
//!
//! Pure functions, no I/O. Callers depend on these exact formats, so they are
//! part of the public contract even though they touch no cache state.

/// Relative URL of the detail page for a restaurant.
pub fn restaurant_detail_url(id: i64) -> String {
    format!("./restaurant.html?id={}", id)
}

/// Image URL for a photo reference, e.g. "3" -> "/img/3.jpg".
pub fn restaurant_image_url(photo_ref: &str) -> String {
    format!("/img/{}.jpg", photo_ref)
}

/// Image URL for a specific responsive width bucket,
/// e.g. ("3", 400) -> "/img/400w-3.jpg".
pub fn restaurant_image_url_for_width(photo_ref: &str, width: u32) -> String {
    format!("/img/{}w-{}.jpg", width, photo_ref)
}
