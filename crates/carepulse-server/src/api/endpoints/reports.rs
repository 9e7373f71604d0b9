//! Reporting endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use carepulse_core::{AdherenceExporter, DoseTracker};

use super::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Days covered when `from` is omitted.
const DEFAULT_REPORT_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct AdherenceQuery {
    pub patient_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: Option<String>,
}

/// `GET /api/reports/adherence?patient_id=&from=&to=&format=json|csv`
pub async fn adherence(
    State(ctx): State<ApiContext>,
    query: Result<Query<AdherenceQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let patient_id = query.patient_id.as_deref().map(parse_id).transpose()?;

    let to = query
        .to
        .unwrap_or_else(|| Utc::now().with_timezone(&ctx.zone).date_naive());
    let from = query
        .from
        .unwrap_or(to - Duration::days(DEFAULT_REPORT_DAYS - 1));
    if from > to {
        return Err(ApiError::BadRequest("from is after to".into()));
    }

    let db = ctx.lock_db()?;
    // Elapsed slots count as missed, not pending
    DoseTracker::new(&db, ctx.zone).sweep_missed(Utc::now())?;
    let report = AdherenceExporter::new(&db).export(patient_id.as_deref(), from, to)?;

    match query.format.as_deref().unwrap_or("json") {
        "json" => Ok(Json(report).into_response()),
        "csv" => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"adherence.csv\""),
            ],
            report.to_csv(),
        )
            .into_response()),
        other => Err(ApiError::BadRequest(format!("unsupported format: {}", other))),
    }
}
