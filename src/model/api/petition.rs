use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        common::{Category, PetitionStatus},
        db::{Petition, User},
    },
};

use super::pagination::PaginationResult;

/// Raw petition creation data. Category is validated at the boundary.
#[derive(Clone, Serialize, Deserialize)]
pub struct PetitionSpec {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
}

impl PetitionSpec {
    /// Validate the spec, returning the parsed category.
    pub fn validate(&self) -> Result<Category> {
        non_blank(&self.title, "title")?;
        non_blank(&self.description, "description")?;
        non_blank(&self.location, "location")?;
        self.category.parse().map_err(Error::BadRequest)
    }
}

/// Status update request body. The status is a raw string, validated at
/// the boundary.
#[derive(Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Official response request body. `status` defaults to `closed` when
/// omitted.
#[derive(Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A user as embedded in petition views.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// An official response with the responder's identity resolved.
#[derive(Debug, Serialize, Deserialize)]
pub struct OfficialResponseView {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official: Option<UserRef>,
    pub responded_at: DateTime<Utc>,
}

/// A single petition in a list: identities unresolved, for bulk display.
#[derive(Debug, Serialize, Deserialize)]
pub struct PetitionSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub status: PetitionStatus,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Petition> for PetitionSummary {
    fn from(petition: &Petition) -> Self {
        Self {
            id: petition.id.to_string(),
            title: petition.title.clone(),
            description: petition.description.clone(),
            category: petition.category,
            location: petition.location.clone(),
            status: petition.status,
            creator: petition.creator.to_string(),
            created_at: petition.created_at,
        }
    }
}

/// A page of petitions.
#[derive(Debug, Serialize)]
pub struct PetitionList {
    #[serde(flatten)]
    pub pagination: PaginationResult,
    pub petitions: Vec<PetitionSummary>,
}

/// A fully-resolved petition: creator and responder identities looked up,
/// signature count included.
#[derive(Debug, Serialize, Deserialize)]
pub struct PetitionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub status: PetitionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_response: Option<OfficialResponseView>,
    pub signature_count: u64,
    pub created_at: DateTime<Utc>,
}

impl PetitionView {
    pub fn new(
        petition: &Petition,
        creator: Option<&User>,
        responder: Option<&User>,
        signature_count: u64,
    ) -> Self {
        Self {
            id: petition.id.to_string(),
            title: petition.title.clone(),
            description: petition.description.clone(),
            category: petition.category,
            location: petition.location.clone(),
            status: petition.status,
            creator: creator.map(UserRef::from),
            official_response: petition.official_response.as_ref().map(|response| {
                OfficialResponseView {
                    text: response.text.clone(),
                    official: responder.map(UserRef::from),
                    responded_at: response.responded_at,
                }
            }),
            signature_count,
            created_at: petition.created_at,
        }
    }
}

/// Response to a successful signature.
#[derive(Serialize, Deserialize)]
pub struct SignResponse {
    pub message: String,
    pub signature_count: u64,
}

/// Reject blank or whitespace-only required fields.
pub fn non_blank(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::bad_request(format!("Please add a {}", field)))
    } else {
        Ok(())
    }
}
