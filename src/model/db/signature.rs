use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single (petition, user) endorsement.
///
/// Uniqueness per pair is enforced by a compound index, not by the
/// application; see `ensure_indexes_exist`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignatureCore {
    pub petition: Id,
    pub user: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl SignatureCore {
    pub fn new(petition: Id, user: Id) -> Self {
        Self {
            petition,
            user,
            created_at: Utc::now(),
        }
    }
}

/// A signature without an ID.
pub type NewSignature = SignatureCore;

/// A signature from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub signature: SignatureCore,
}

impl Deref for Signature {
    type Target = SignatureCore;

    fn deref(&self) -> &Self::Target {
        &self.signature
    }
}
