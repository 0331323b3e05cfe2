//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 timestamps.

pub mod auth;
pub mod pagination;
pub mod petition;
pub mod poll;
pub mod report;
