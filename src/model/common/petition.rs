use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The lifecycle state of a petition.
///
/// Petitions start `active`, and only officials may move them between
/// states after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionStatus {
    Active,
    UnderReview,
    Closed,
}

impl Display for PetitionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Active => "active",
            Self::UnderReview => "under_review",
            Self::Closed => "closed",
        };
        write!(f, "{}", status)
    }
}

impl FromStr for PetitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "under_review" => Ok(Self::UnderReview),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid status '{}'", s)),
        }
    }
}

impl From<PetitionStatus> for Bson {
    fn from(status: PetitionStatus) -> Self {
        to_bson(&status).unwrap() // Valid because `PetitionStatus` serialization doesn't fail
    }
}

/// The subject area of a petition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infrastructure,
    Sanitation,
    Environment,
    Safety,
    Transport,
    Health,
    Education,
    Other,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let category = match self {
            Self::Infrastructure => "infrastructure",
            Self::Sanitation => "sanitation",
            Self::Environment => "environment",
            Self::Safety => "safety",
            Self::Transport => "transport",
            Self::Health => "health",
            Self::Education => "education",
            Self::Other => "other",
        };
        write!(f, "{}", category)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infrastructure" => Ok(Self::Infrastructure),
            "sanitation" => Ok(Self::Sanitation),
            "environment" => Ok(Self::Environment),
            "safety" => Ok(Self::Safety),
            "transport" => Ok(Self::Transport),
            "health" => Ok(Self::Health),
            "education" => Ok(Self::Education),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid category '{}'", s)),
        }
    }
}

impl From<Category> for Bson {
    fn from(category: Category) -> Self {
        to_bson(&category).unwrap() // Valid because `Category` serialization doesn't fail
    }
}
