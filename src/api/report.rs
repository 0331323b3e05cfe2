use mongodb::bson::{doc, Bson};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            report::{CsvAttachment, Report, ReportFilter},
        },
        common::Role,
        db::{AdminLogCore, NewAdminLog, Petition, Poll, Signature, Vote},
        mongodb::Coll,
    },
};

use super::common::audit;

pub fn routes() -> Vec<Route> {
    routes![get_reports, export_report]
}

#[get("/reports?<location>&<from>&<to>")]
pub async fn get_reports(
    token: AuthToken,
    location: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
    petitions: Coll<Petition>,
    polls: Coll<Poll>,
    signatures: Coll<Signature>,
    votes: Coll<Vote>,
) -> Result<Json<Report>> {
    token.require_any(&[Role::Official, Role::Admin])?;
    let filter = ReportFilter::parse(location, from, to)?;
    let report = compile_report(&filter, &petitions, &polls, &signatures, &votes).await?;
    Ok(Json(report))
}

#[get("/reports/export?<format>&<location>&<from>&<to>")]
pub async fn export_report(
    token: AuthToken,
    format: Option<&str>,
    location: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
    petitions: Coll<Petition>,
    polls: Coll<Poll>,
    signatures: Coll<Signature>,
    votes: Coll<Vote>,
    logs: Coll<NewAdminLog>,
) -> Result<CsvAttachment> {
    token.require_any(&[Role::Official, Role::Admin])?;
    let format = format.unwrap_or("csv");
    if format != "csv" {
        return Err(Error::bad_request(format!(
            "Unsupported export format '{}'",
            format
        )));
    }

    let filter = ReportFilter::parse(location, from, to)?;
    let report = compile_report(&filter, &petitions, &polls, &signatures, &votes).await?;

    audit(&logs, AdminLogCore::report_export(token.id())).await;

    Ok(CsvAttachment(report.to_csv()))
}

/// Gather the documents the filter matches and build the report.
/// Signatures and votes are scoped to the matched petitions and polls, so
/// a location or date filter narrows all counters consistently.
async fn compile_report(
    filter: &ReportFilter,
    petitions: &Coll<Petition>,
    polls: &Coll<Poll>,
    signatures: &Coll<Signature>,
    votes: &Coll<Vote>,
) -> Result<Report> {
    let matched: Vec<Petition> = petitions
        .find(filter.petition_filter(), None)
        .await?
        .try_collect()
        .await?;
    let petition_ids: Vec<Bson> = matched.iter().map(|petition| petition.id.into()).collect();
    let total_signatures = if petition_ids.is_empty() {
        0
    } else {
        signatures
            .count_documents(doc! {"petition": {"$in": petition_ids}}, None)
            .await?
    };

    let matched_polls: Vec<Poll> = polls
        .find(filter.poll_filter(), None)
        .await?
        .try_collect()
        .await?;
    let poll_ids: Vec<Bson> = matched_polls.iter().map(|poll| poll.id.into()).collect();
    let total_votes = if poll_ids.is_empty() {
        0
    } else {
        votes
            .count_documents(doc! {"poll": {"$in": poll_ids}}, None)
            .await?
    };

    Ok(Report::build(&matched, total_signatures, total_votes))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use crate::api::common::testing::{bearer, create_petition, create_poll, register};
    use crate::model::api::auth::RegisterRequest;
    use crate::model::db::AdminLog;

    use super::*;

    /// Seed two Delhi petitions (one closed, one signed), a Mumbai petition,
    /// and a Delhi poll with one vote. Returns the official's token.
    async fn seed(client: &Client) -> String {
        let citizen = register(client, &RegisterRequest::example_citizen()).await;
        let official = register(client, &RegisterRequest::example_official()).await;

        let signed =
            create_petition(client, &citizen, "Streetlights", "infrastructure", "Delhi").await;
        let closed =
            create_petition(client, &citizen, "Garbage pileup", "sanitation", "Delhi").await;
        create_petition(client, &citizen, "Open drains", "sanitation", "Mumbai").await;

        let response = client
            .post(format!("/petitions/{signed}/sign"))
            .header(bearer(&citizen))
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        let response = client
            .put(format!("/petitions/{closed}"))
            .header(ContentType::JSON)
            .header(bearer(&official))
            .body(json!({"status": "closed"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let poll = create_poll(client, &official, "Ban fireworks?", &["Yes", "No"], "Delhi").await;
        let response = client
            .post(format!("/polls/{poll}/vote"))
            .header(ContentType::JSON)
            .header(bearer(&citizen))
            .body(json!({"selected_option": "Yes"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        official
    }

    #[backend_test]
    async fn reports_are_for_officials_only(client: Client) {
        let response = client.get("/reports").dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        let citizen = register(&client, &RegisterRequest::example_citizen()).await;
        let response = client
            .get("/reports")
            .header(bearer(&citizen))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let admin = register(&client, &RegisterRequest::example_admin()).await;
        let response = client.get("/reports").header(bearer(&admin)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn report_counts_match_the_seeded_data(client: Client) {
        let official = seed(&client).await;

        let response = client.get("/reports").header(bearer(&official)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let report: Report = response.into_json().await.unwrap();
        assert_eq!(report.metrics.petitions_created, 3);
        assert_eq!(report.metrics.petitions_active, 2);
        assert_eq!(report.metrics.petitions_resolved, 1);
        assert_eq!(report.metrics.total_signatures, 1);
        assert_eq!(report.metrics.total_votes, 1);
        // All seeded today, so a single trend bucket.
        assert_eq!(report.trend_data.len(), 1);
        assert_eq!(report.trend_data[0].petitions, 3);
    }

    #[backend_test]
    async fn location_filter_narrows_every_counter(client: Client) {
        let official = seed(&client).await;

        let response = client
            .get("/reports?location=Mumbai")
            .header(bearer(&official))
            .dispatch()
            .await;
        let report: Report = response.into_json().await.unwrap();
        assert_eq!(report.metrics.petitions_created, 1);
        assert_eq!(report.metrics.total_signatures, 0);
        assert_eq!(report.metrics.total_votes, 0);
    }

    #[backend_test]
    async fn date_filters_are_validated_and_applied(client: Client) {
        let official = seed(&client).await;

        let response = client
            .get("/reports?from=yesterday")
            .header(bearer(&official))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // A range entirely in the past matches nothing.
        let response = client
            .get("/reports?from=2000-01-01&to=2000-01-02")
            .header(bearer(&official))
            .dispatch()
            .await;
        let report: Report = response.into_json().await.unwrap();
        assert_eq!(report.metrics.petitions_created, 0);
        assert_eq!(report.metrics.total_votes, 0);
    }

    #[backend_test]
    async fn export_produces_csv_and_is_audited(client: Client, logs: Coll<AdminLog>) {
        let official = seed(&client).await;

        let response = client
            .get("/reports/export")
            .header(bearer(&official))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(Some(ContentType::CSV), response.content_type());
        assert!(response
            .headers()
            .get_one("Content-Disposition")
            .unwrap()
            .contains("civix_report.csv"));

        let csv = response.into_string().await.unwrap();
        assert!(csv.starts_with("metric,value\n"));
        assert!(csv.contains("Petitions Created,3\n"));
        assert!(csv.contains("Total Signatures,1\n"));

        let entries = logs
            .count_documents(doc! {"action": "report_export"}, None)
            .await
            .unwrap();
        assert_eq!(entries, 1);
    }

    #[backend_test]
    async fn unsupported_export_formats_are_rejected(client: Client) {
        let official = register(&client, &RegisterRequest::example_official()).await;
        let response = client
            .get("/reports/export?format=pdf")
            .header(bearer(&official))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }
}
