use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single (poll, user) choice.
///
/// Uniqueness per pair is enforced by a compound index, not by the
/// application; see `ensure_indexes_exist`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteCore {
    pub poll: Id,
    pub user: Id,
    pub selected_option: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoteCore {
    pub fn new(poll: Id, user: Id, selected_option: String) -> Self {
        Self {
            poll,
            user,
            selected_option,
            created_at: Utc::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
