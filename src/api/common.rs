use crate::{
    error::{Error, Result},
    model::{
        api::auth::AuthToken,
        db::{NewAdminLog, Petition, Poll, User},
        mongodb::{Coll, Id},
    },
};

/// Resolve the authenticated caller to their full user record.
pub async fn user_by_token(token: &AuthToken, users: &Coll<User>) -> Result<User> {
    users
        .find_one(token.id().as_doc(), None)
        .await?
        .ok_or_else(|| Error::unauthorized("No user matching the provided credentials"))
}

/// Look up a petition by its raw ID, rejecting malformed IDs with 400 and
/// unknown ones with 404.
pub async fn petition_by_id(id: &str, petitions: &Coll<Petition>) -> Result<Petition> {
    let id: Id = id.parse()?;
    petitions
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Petition with ID '{}'", id)))
}

/// Look up a poll by its raw ID, rejecting malformed IDs with 400 and
/// unknown ones with 404.
pub async fn poll_by_id(id: &str, polls: &Coll<Poll>) -> Result<Poll> {
    let id: Id = id.parse()?;
    polls
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll with ID '{}'", id)))
}

/// Append an entry to the admin log. Best-effort: a failed write is logged
/// and never fails the mutation it records.
pub async fn audit(logs: &Coll<NewAdminLog>, entry: NewAdminLog) {
    if let Err(err) = logs.insert_one(&entry, None).await {
        warn!("Failed to write admin log entry for {:?}: {err}", entry.action);
    }
}
