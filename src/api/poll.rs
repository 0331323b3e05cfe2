use std::collections::HashMap;

use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            pagination::Pagination,
            petition::non_blank,
            poll::{tally, PollList, PollResults, PollSpec, PollView, VoteRequest},
        },
        common::{location_regex, Role},
        db::{AdminLogCore, NewAdminLog, NewPoll, NewVote, Poll, PollCore, User, Vote, VoteCore},
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    ratelimit::VoteLimiter,
    Config,
};

use super::common::{audit, poll_by_id, user_by_token};

pub fn routes() -> Vec<Route> {
    routes![create_poll, get_polls, get_poll, vote]
}

#[post("/polls", data = "<spec>", format = "json")]
pub async fn create_poll(
    token: AuthToken,
    spec: Json<PollSpec>,
    polls: Coll<NewPoll>,
    users: Coll<User>,
    logs: Coll<NewAdminLog>,
) -> Result<(Status, Json<PollView>)> {
    token.require_any(&[Role::Official, Role::Admin])?;
    let options = spec.validate()?;
    let official = user_by_token(&token, &users).await?;

    let poll = PollCore::new(
        spec.title.trim().to_string(),
        options,
        spec.target_location.trim().to_string(),
        official.id,
    );
    let new_id: Id = polls
        .insert_one(&poll, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the DB
        .into();
    let poll = Poll { id: new_id, poll };

    audit(
        &logs,
        AdminLogCore::poll_created(token.id(), &poll.title, &poll.target_location),
    )
    .await;

    Ok((
        Status::Created,
        Json(PollView::new(&poll, Some(official.name.clone()))),
    ))
}

#[get("/polls")]
pub async fn get_polls(
    token: AuthToken,
    pagination: Pagination,
    polls: Coll<Poll>,
    users: Coll<User>,
) -> Result<Json<PollList>> {
    // Everyone sees the polls targeting their own location.
    let caller = user_by_token(&token, &users).await?;
    let filter = doc! {"target_location": location_regex(&caller.location)};

    let options = FindOptions::builder()
        .sort(doc! {"created_at": -1})
        .skip(pagination.skip())
        .limit(pagination.page_size() as i64)
        .build();
    let page: Vec<Poll> = polls
        .find(filter.clone(), options)
        .await?
        .try_collect()
        .await?;
    let total = polls.count_documents(filter, None).await?;

    // Resolve creator names, caching repeated lookups within the page.
    let mut names: HashMap<Id, Option<String>> = HashMap::new();
    let mut views = Vec::with_capacity(page.len());
    for poll in &page {
        let name = match names.get(&poll.created_by) {
            Some(name) => name.clone(),
            None => {
                let name = users
                    .find_one(poll.created_by.as_doc(), None)
                    .await?
                    .map(|user| user.name.clone());
                names.insert(poll.created_by, name.clone());
                name
            }
        };
        views.push(PollView::new(poll, name));
    }

    Ok(Json(PollList {
        pagination: pagination.result(total),
        polls: views,
    }))
}

#[get("/polls/<id>")]
pub async fn get_poll(
    _token: AuthToken,
    id: &str,
    polls: Coll<Poll>,
    users: Coll<User>,
    votes: Coll<Vote>,
) -> Result<Json<PollResults>> {
    let poll = poll_by_id(id, &polls).await?;
    Ok(Json(results_for(&poll, &users, &votes).await?))
}

#[post("/polls/<id>/vote", data = "<request>", format = "json")]
pub async fn vote(
    token: AuthToken,
    id: &str,
    request: Json<VoteRequest>,
    config: &State<Config>,
    limiter: &State<VoteLimiter>,
    polls: Coll<Poll>,
    users: Coll<User>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
) -> Result<(Status, Json<PollResults>)> {
    token.require(Role::Citizen)?;
    // Every attempt counts against the limit, successful or not.
    limiter.check(token.id(), config.vote_window(), config.vote_limit())?;
    non_blank(&request.selected_option, "selected option")?;

    let poll = poll_by_id(id, &polls).await?;
    let selected_option = request.selected_option.trim().to_string();
    if !poll.options.contains(&selected_option) {
        return Err(Error::bad_request("Invalid poll option"));
    }

    // The unique (poll, user) index turns a concurrent double-vote into a
    // duplicate key error rather than a second vote.
    let vote = VoteCore::new(poll.id, token.id(), selected_option);
    match new_votes.insert_one(&vote, None).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::bad_request("You have already voted on this poll."));
        }
        Err(err) => return Err(err.into()),
    }

    Ok((
        Status::Created,
        Json(results_for(&poll, &users, &votes).await?),
    ))
}

/// Compute the current results for a poll, with the creator's name resolved.
async fn results_for(
    poll: &Poll,
    users: &Coll<User>,
    votes: &Coll<Vote>,
) -> Result<PollResults> {
    let created_by = users
        .find_one(poll.created_by.as_doc(), None)
        .await?
        .map(|user| user.name.clone());
    let cast: Vec<Vote> = votes
        .find(doc! {"poll": poll.id}, None)
        .await?
        .try_collect()
        .await?;
    let (total_votes, results) = tally(&poll.options, &cast);
    Ok(PollResults {
        poll: PollView::new(poll, created_by),
        total_votes,
        results,
    })
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use crate::api::common::testing::{bearer, create_poll as new_poll, register};
    use crate::model::api::auth::RegisterRequest;
    use crate::model::db::AdminLog;

    use super::*;

    #[backend_test]
    async fn only_officials_create_polls(client: Client) {
        let citizen = register(&client, &RegisterRequest::example_citizen()).await;
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .header(bearer(&citizen))
            .body(
                json!({
                    "title": "Extend the metro line?",
                    "options": ["Yes", "No"],
                    "target_location": "Pune",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn poll_options_are_sanitized(client: Client, logs: Coll<AdminLog>) {
        let official = register(&client, &RegisterRequest::example_official()).await;

        // One valid option is not enough.
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .header(bearer(&official))
            .body(
                json!({
                    "title": "Extend the metro line?",
                    "options": ["Yes", "   "],
                    "target_location": "Pune",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Blank options are dropped, valid ones trimmed.
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .header(bearer(&official))
            .body(
                json!({
                    "title": "Extend the metro line?",
                    "options": ["  Yes ", "", "No"],
                    "target_location": "Pune",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let view: PollView = response.into_json().await.unwrap();
        assert_eq!(view.options, vec!["Yes", "No"]);
        assert_eq!(view.created_by.unwrap(), "Meera Iyer");

        // Poll creation was audited.
        let entries = logs
            .count_documents(doc! {"action": "poll_created"}, None)
            .await
            .unwrap();
        assert_eq!(entries, 1);
    }

    #[backend_test]
    async fn vote_and_tally_scenario(client: Client) {
        let official = register(&client, &RegisterRequest::example_official()).await;
        let voter = register(&client, &RegisterRequest::example_citizen2()).await;
        let id = new_poll(
            &client,
            &official,
            "Extend the metro line?",
            &["Yes", "No"],
            "Pune",
        )
        .await;

        // Officials cannot vote.
        let response = client
            .post(format!("/polls/{id}/vote"))
            .header(ContentType::JSON)
            .header(bearer(&official))
            .body(json!({"selected_option": "Yes"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        // Voting for something not on the ballot is invalid.
        let response = client
            .post(format!("/polls/{id}/vote"))
            .header(ContentType::JSON)
            .header(bearer(&voter))
            .body(json!({"selected_option": "Maybe"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // A real vote counts.
        let response = client
            .post(format!("/polls/{id}/vote"))
            .header(ContentType::JSON)
            .header(bearer(&voter))
            .body(json!({"selected_option": "Yes"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        // Voting twice does not.
        let response = client
            .post(format!("/polls/{id}/vote"))
            .header(ContentType::JSON)
            .header(bearer(&voter))
            .body(json!({"selected_option": "No"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .get(format!("/polls/{id}"))
            .header(bearer(&voter))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results: PollResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.results[0].option, "Yes");
        assert_eq!(results.results[0].count, 1);
        assert_eq!(results.results[0].percentage, 100);
        assert_eq!(results.results[1].option, "No");
        assert_eq!(results.results[1].count, 0);
        assert_eq!(results.results[1].percentage, 0);
    }

    #[backend_test]
    async fn vote_attempts_are_rate_limited(client: Client) {
        let official = register(&client, &RegisterRequest::example_official()).await;
        let voter = register(&client, &RegisterRequest::example_citizen()).await;
        let id = new_poll(&client, &official, "Ban fireworks?", &["Yes", "No"], "Delhi").await;

        // The limit is 5 attempts per window; failed attempts count too.
        let mut statuses = Vec::new();
        for _ in 0..6 {
            let response = client
                .post(format!("/polls/{id}/vote"))
                .header(ContentType::JSON)
                .header(bearer(&voter))
                .body(json!({"selected_option": "Yes"}).to_string())
                .dispatch()
                .await;
            statuses.push(response.status());
        }
        assert_eq!(statuses[0], Status::Created);
        for status in &statuses[1..5] {
            assert_eq!(*status, Status::BadRequest);
        }
        assert_eq!(statuses[5], Status::TooManyRequests);
    }

    #[backend_test]
    async fn list_is_scoped_to_the_callers_location(client: Client) {
        let official = register(&client, &RegisterRequest::example_official()).await;
        new_poll(&client, &official, "Ban fireworks?", &["Yes", "No"], "Delhi").await;
        new_poll(&client, &official, "Car-free Sundays?", &["Yes", "No"], "North Delhi").await;
        new_poll(
            &client,
            &official,
            "Extend the metro line?",
            &["Yes", "No"],
            "Pune",
        )
        .await;

        // Listing is not public.
        let response = client.get("/polls").dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        // A Delhi caller sees the Delhi and North Delhi polls, newest first.
        let in_delhi = register(&client, &RegisterRequest::example_citizen()).await;
        let response = client.get("/polls").header(bearer(&in_delhi)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["total"], 2);
        assert_eq!(body["polls"][0]["title"], "Car-free Sundays?");
        assert_eq!(body["polls"][1]["title"], "Ban fireworks?");

        // A Pune caller sees only the Pune poll.
        let in_pune = register(&client, &RegisterRequest::example_citizen2()).await;
        let response = client.get("/polls").header(bearer(&in_pune)).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["polls"][0]["title"], "Extend the metro line?");
    }
}
