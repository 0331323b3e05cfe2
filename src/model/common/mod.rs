//! Types and rules shared between the API and DB layers.

mod admin_log;
mod location;
mod petition;
mod role;

pub use admin_log::LogAction;
pub use location::{location_matches, location_regex};
pub use petition::{Category, PetitionStatus};
pub use role::Role;
