use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The kinds of privileged action recorded in the admin log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    StatusUpdate,
    ResponseSubmitted,
    PollCreated,
    ReportExport,
}

impl From<LogAction> for Bson {
    fn from(action: LogAction) -> Self {
        to_bson(&action).unwrap() // Valid because `LogAction` serialization doesn't fail
    }
}
