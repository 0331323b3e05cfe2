use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::db::{Poll, Vote},
};

use super::{pagination::PaginationResult, petition::non_blank};

/// Raw poll creation data.
#[derive(Clone, Serialize, Deserialize)]
pub struct PollSpec {
    pub title: String,
    pub options: Vec<String>,
    pub target_location: String,
}

impl PollSpec {
    /// Validate the spec, returning the sanitized option list.
    pub fn validate(&self) -> Result<Vec<String>> {
        non_blank(&self.title, "poll title")?;
        non_blank(&self.target_location, "target location")?;
        let options = sanitize_options(&self.options);
        if options.len() < 2 {
            return Err(Error::bad_request(
                "Poll must have at least two valid options",
            ));
        }
        Ok(options)
    }
}

/// Trim all options and drop the blank ones.
pub fn sanitize_options(options: &[String]) -> Vec<String> {
    options
        .iter()
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect()
}

/// Vote request body.
#[derive(Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub selected_option: String,
}

/// A poll as exposed over the API, with the creator's name resolved where
/// available.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollView {
    pub id: String,
    pub title: String,
    pub options: Vec<String>,
    pub target_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PollView {
    pub fn new(poll: &Poll, created_by: Option<String>) -> Self {
        Self {
            id: poll.id.to_string(),
            title: poll.title.clone(),
            options: poll.options.clone(),
            target_location: poll.target_location.clone(),
            created_by,
            created_at: poll.created_at,
        }
    }
}

/// A page of polls.
#[derive(Debug, Serialize)]
pub struct PollList {
    #[serde(flatten)]
    pub pagination: PaginationResult,
    pub polls: Vec<PollView>,
}

/// The tally for a single option.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub option: String,
    pub count: u64,
    /// Integer percentage of the total, rounded half-up; 0 when there are
    /// no votes at all.
    pub percentage: u64,
}

/// A poll plus its computed results.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollResults {
    #[serde(flatten)]
    pub poll: PollView,
    pub total_votes: u64,
    pub results: Vec<OptionTally>,
}

/// Compute per-option counts and percentages. Votes for options the poll
/// doesn't have (impossible through the API) are ignored in the per-option
/// counts but still contribute to the total, matching a plain group-by.
pub fn tally(options: &[String], votes: &[Vote]) -> (u64, Vec<OptionTally>) {
    let total = votes.len() as u64;
    let results = options
        .iter()
        .map(|option| {
            let count = votes
                .iter()
                .filter(|vote| &vote.selected_option == option)
                .count() as u64;
            OptionTally {
                option: option.clone(),
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();
    (total, results)
}

/// Integer percentage, rounded half-up. 0 when the total is 0.
fn percentage(count: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (count * 100 + total / 2) / total
    }
}
