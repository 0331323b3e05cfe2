use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{LogAction, PetitionStatus},
    mongodb::Id,
};

/// An append-only record of a privileged action.
///
/// Entries are write-only from the application's point of view; nothing
/// reads them back through the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLogCore {
    pub action: LogAction,
    pub user: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub petition: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl AdminLogCore {
    fn new(action: LogAction, user: Id, petition: Option<Id>, details: Option<String>) -> Self {
        Self {
            action,
            user,
            petition,
            details,
            timestamp: Utc::now(),
        }
    }

    /// An official changed a petition's status.
    pub fn status_update(official: Id, petition: Id, status: PetitionStatus) -> Self {
        Self::new(
            LogAction::StatusUpdate,
            official,
            Some(petition),
            Some(format!("Changed status to {}", status)),
        )
    }

    /// An official responded to a petition.
    pub fn response_submitted(official: Id, petition: Id, status: PetitionStatus) -> Self {
        Self::new(
            LogAction::ResponseSubmitted,
            official,
            Some(petition),
            Some(format!("Responded and set status to {}", status)),
        )
    }

    /// An official or admin created a poll.
    pub fn poll_created(creator: Id, title: &str, target_location: &str) -> Self {
        Self::new(
            LogAction::PollCreated,
            creator,
            None,
            Some(format!("Created poll '{}' for {}", title, target_location)),
        )
    }

    /// An official exported a report.
    pub fn report_export(official: Id) -> Self {
        Self::new(
            LogAction::ReportExport,
            official,
            None,
            Some("Exported report as CSV".to_string()),
        )
    }
}

/// A log entry without an ID.
pub type NewAdminLog = AdminLogCore;

/// A log entry from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLog {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub entry: AdminLogCore,
}

impl Deref for AdminLog {
    type Target = AdminLogCore;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}
