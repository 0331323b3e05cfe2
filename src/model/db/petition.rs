use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{Category, PetitionStatus},
    mongodb::Id,
};

/// An official's response to a petition, embedded in the petition itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialResponse {
    pub text: String,
    pub official: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub responded_at: DateTime<Utc>,
}

/// Core petition data, as stored in the database.
#[derive(Debug, Serialize, Deserialize)]
pub struct PetitionCore {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub status: PetitionStatus,
    pub creator: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_response: Option<OfficialResponse>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PetitionCore {
    /// Create a new petition in the initial `active` state.
    pub fn new(
        title: String,
        description: String,
        category: Category,
        location: String,
        creator: Id,
    ) -> Self {
        Self {
            title,
            description,
            category,
            location,
            status: PetitionStatus::Active,
            creator,
            official_response: None,
            created_at: Utc::now(),
        }
    }
}

/// A petition without an ID.
pub type NewPetition = PetitionCore;

/// A petition from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Petition {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub petition: PetitionCore,
}

impl Deref for Petition {
    type Target = PetitionCore;

    fn deref(&self) -> &Self::Target {
        &self.petition
    }
}

impl DerefMut for Petition {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.petition
    }
}
