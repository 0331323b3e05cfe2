use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core poll data, as stored in the database.
///
/// The option list is already sanitized (trimmed, no blanks, at least two
/// entries) by the time it gets here; polls are immutable after creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollCore {
    pub title: String,
    pub options: Vec<String>,
    pub target_location: String,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PollCore {
    pub fn new(title: String, options: Vec<String>, target_location: String, created_by: Id) -> Self {
        Self {
            title,
            options,
            target_location,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}
