//! The location-matching policy.
//!
//! A resource (petition or poll) matches a jurisdiction iff the resource's
//! location contains the jurisdiction as a case-insensitive substring, so
//! an official for "Delhi" covers petitions in both "Delhi" and
//! "North Delhi". The same rule is applied everywhere a location is
//! matched: official petition listing, poll listing, the respond
//! jurisdiction check, and report filters.

use mongodb::bson::{doc, Document};

/// Does the resource's location fall within the given jurisdiction?
pub fn location_matches(resource_location: &str, jurisdiction: &str) -> bool {
    resource_location
        .to_lowercase()
        .contains(&jurisdiction.to_lowercase())
}

/// A filter value implementing the same policy as [`location_matches`] as
/// a case-insensitive MongoDB regex, for use inside a query document.
pub fn location_regex(jurisdiction: &str) -> Document {
    doc! {
        "$regex": escape_regex(jurisdiction),
        "$options": "i",
    }
}

/// Escape regex metacharacters so the jurisdiction is matched literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
