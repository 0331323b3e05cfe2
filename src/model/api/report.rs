use std::collections::BTreeMap;
use std::io::Cursor;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use rocket::{
    http::{ContentType, Header},
    response::{self, Responder},
    Request, Response,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        common::{location_regex, PetitionStatus},
        db::Petition,
    },
};

/// The filters a report is scoped by. Dates are inclusive whole days;
/// the same location policy as everywhere else applies.
pub struct ReportFilter {
    location: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl ReportFilter {
    /// Parse raw query parameters, rejecting malformed dates.
    pub fn parse(
        location: Option<String>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            location: location.filter(|location| !location.trim().is_empty()),
            from: from.map(parse_date).transpose()?,
            to: to.map(parse_date).transpose()?,
        })
    }

    /// The filter document for the petitions collection.
    pub fn petition_filter(&self) -> Document {
        self.filter_doc("location")
    }

    /// The filter document for the polls collection.
    pub fn poll_filter(&self) -> Document {
        self.filter_doc("target_location")
    }

    fn filter_doc(&self, location_field: &str) -> Document {
        let mut filter = doc! {};
        if let Some(ref location) = self.location {
            filter.insert(location_field, location_regex(location));
        }
        let mut range = doc! {};
        if let Some(from) = self.from {
            range.insert("$gte", bson_datetime(start_of_day(from)));
        }
        if let Some(to) = self.to {
            range.insert("$lte", bson_datetime(end_of_day(to)));
        }
        if !range.is_empty() {
            filter.insert("created_at", range);
        }
        filter
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::bad_request(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_milli_opt(23, 59, 59, 999).unwrap())
}

fn bson_datetime(datetime: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_chrono(datetime)
}

/// Headline counters for the reporting dashboard.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub petitions_created: u64,
    pub petitions_active: u64,
    pub petitions_pending: u64,
    pub petitions_resolved: u64,
    pub total_signatures: u64,
    pub total_votes: u64,
}

/// Petition creation count for one day.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub petitions: u64,
}

/// The full report: a pure function of the matched documents.
#[derive(Debug, Serialize, Deserialize)]
pub struct Report {
    pub metrics: ReportMetrics,
    pub trend_data: Vec<TrendPoint>,
}

impl Report {
    /// Assemble a report from the matched petitions and the signature and
    /// vote counts over the same scope.
    pub fn build(petitions: &[Petition], total_signatures: u64, total_votes: u64) -> Self {
        let mut metrics = ReportMetrics {
            petitions_created: petitions.len() as u64,
            total_signatures,
            total_votes,
            ..ReportMetrics::default()
        };
        for petition in petitions {
            match petition.status {
                PetitionStatus::Active => metrics.petitions_active += 1,
                PetitionStatus::UnderReview => metrics.petitions_pending += 1,
                PetitionStatus::Closed => metrics.petitions_resolved += 1,
            }
        }
        Self {
            metrics,
            trend_data: daily_trend(petitions),
        }
    }

    /// Flatten the report into (metric, value) rows for export.
    pub fn rows(&self) -> Vec<(String, u64)> {
        vec![
            ("Petitions Created".to_string(), self.metrics.petitions_created),
            ("Petitions Active".to_string(), self.metrics.petitions_active),
            ("Petitions Pending".to_string(), self.metrics.petitions_pending),
            ("Petitions Resolved".to_string(), self.metrics.petitions_resolved),
            ("Total Signatures".to_string(), self.metrics.total_signatures),
            ("Total Votes".to_string(), self.metrics.total_votes),
        ]
    }

    /// Render the flat rows as CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("metric,value\n");
        for (metric, value) in self.rows() {
            csv.push_str(&format!("{},{}\n", csv_field(&metric), value));
        }
        csv
    }
}

/// Daily petition-creation counts, oldest day first.
fn daily_trend(petitions: &[Petition]) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for petition in petitions {
        *days.entry(petition.created_at.date_naive()).or_default() += 1;
    }
    days.into_iter()
        .map(|(day, count)| TrendPoint {
            label: day.format("%Y-%m-%d").to_string(),
            petitions: count,
        })
        .collect()
}

/// Quote a CSV field if it contains a delimiter, quote, or newline.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// A CSV report served as a file download.
pub struct CsvAttachment(pub String);

impl<'r, 'o: 'r> Responder<'r, 'o> for CsvAttachment {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        Response::build()
            .header(ContentType::CSV)
            .header(Header::new(
                "Content-Disposition",
                "attachment; filename=\"civix_report.csv\"",
            ))
            .sized_body(self.0.len(), Cursor::new(self.0))
            .ok()
    }
}
