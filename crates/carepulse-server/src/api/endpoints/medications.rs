//! Medication endpoints.
//!
//! Dose actions:
//! - `POST /api/medications/take/:id`: mark taken (late after the grace window)
//! - `POST /api/medications/track/:id`: explicit status `{status, notes}`
//!
//! Sessions and their tracking records:
//! - `GET|POST /api/medications/sessions`
//! - `GET /api/medications/sessions/:id`
//! - `POST /api/medications/sessions/:id/deactivate`
//! - `POST /api/medications/sessions/:id/expand`
//! - `GET /api/medications/sessions/:id/tracking`
//! - `GET /api/medications/tracking/:id`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use carepulse_core::{DoseTracker, MedicationSession, MedicationTrackingRecord};

use super::{parse_id, required};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::config::{DEFAULT_EXPAND_DAYS, MAX_EXPAND_DAYS};

// ═══════════════════════════════════════════════════════════
// Dose actions
// ═══════════════════════════════════════════════════════════

/// `POST /api/medications/take/:id`: mark a dose taken now.
pub async fn take(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<MedicationTrackingRecord>, ApiError> {
    let id = parse_id(&id)?;
    let db = ctx.lock_db()?;

    let record = DoseTracker::new(&db, ctx.zone).take(&id, &caller.caller_id, Utc::now())?;
    tracing::info!(record_id = %record.id, status = %record.status, caller = %caller.caller_id, "Dose marked taken");
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /api/medications/track/:id`: set an explicit dose status.
pub async fn track(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<MedicationTrackingRecord>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    let db = ctx.lock_db()?;

    let record = DoseTracker::new(&db, ctx.zone).track(
        &id,
        request.status.trim(),
        request.notes,
        &caller.caller_id,
        Utc::now(),
    )?;
    tracing::info!(record_id = %record.id, status = %record.status, caller = %caller.caller_id, "Dose status recorded");
    Ok(Json(record))
}

/// `POST /api/medications/take/` and `/track/` without an identifier.
pub async fn missing_id() -> ApiError {
    ApiError::BadRequest("tracking record id is required".into())
}

/// `GET /api/medications/tracking/:id`
pub async fn tracking_record(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<MedicationTrackingRecord>, ApiError> {
    let id = parse_id(&id)?;
    let record = ctx
        .lock_db()?
        .get_tracking_record(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("tracking record {}", id)))?;
    Ok(Json(record))
}

// ═══════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub patient_id: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

/// `GET /api/medications/sessions`
pub async fn list_sessions(
    State(ctx): State<ApiContext>,
    query: Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<Json<Vec<MedicationSession>>, ApiError> {
    let Query(query) = query?;
    let patient_id = query.patient_id.as_deref().map(parse_id).transpose()?;

    let sessions = ctx
        .lock_db()?
        .list_sessions(patient_id.as_deref(), query.active_only)?;
    Ok(Json(sessions))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub patient_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub times_of_day: Vec<NaiveTime>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// `POST /api/medications/sessions`
pub async fn create_session(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MedicationSession>), ApiError> {
    let Json(request) = payload?;
    let patient_id = parse_id(&request.patient_id)?;

    if request.times_of_day.is_empty() {
        return Err(ApiError::BadRequest("times_of_day must not be empty".into()));
    }
    if matches!(request.end_date, Some(end) if end < request.start_date) {
        return Err(ApiError::BadRequest("end_date is before start_date".into()));
    }

    let mut session = MedicationSession::new(
        patient_id,
        required("medication_name", &request.medication_name)?,
        required("dosage", &request.dosage)?,
        required("frequency", &request.frequency)?,
        request.times_of_day,
        request.start_date,
    );
    session.end_date = request.end_date;

    let db = ctx.lock_db()?;
    if db.get_patient(&session.patient_id)?.is_none() {
        return Err(ApiError::NotFound(format!("patient {}", session.patient_id)));
    }
    db.insert_session(&session)?;

    tracing::info!(session_id = %session.id, patient_id = %session.patient_id, caller = %caller.caller_id, "Medication session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/medications/sessions/:id`
pub async fn get_session(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<MedicationSession>, ApiError> {
    let id = parse_id(&id)?;
    let session = ctx
        .lock_db()?
        .get_session(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("medication session {}", id)))?;
    Ok(Json(session))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeactivateRequest {
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// `POST /api/medications/sessions/:id/deactivate`: stop a schedule; history stays.
pub async fn deactivate_session(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Option<Json<DeactivateRequest>>,
) -> Result<Json<MedicationSession>, ApiError> {
    let id = parse_id(&id)?;
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let db = ctx.lock_db()?;
    if !db.deactivate_session(&id, request.end_date)? {
        return Err(ApiError::NotFound(format!("medication session {}", id)));
    }
    let session = db
        .get_session(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("medication session {}", id)))?;

    tracing::info!(session_id = %id, caller = %caller.caller_id, "Medication session deactivated");
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct ExpandQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub session_id: String,
    pub through: NaiveDate,
    pub created: usize,
}

/// `POST /api/medications/sessions/:id/expand?days=N`: create pending slots through today + N.
pub async fn expand_session(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    query: Result<Query<ExpandQuery>, QueryRejection>,
) -> Result<Json<ExpandResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_EXPAND_DAYS);
    if days > MAX_EXPAND_DAYS {
        return Err(ApiError::BadRequest(format!("days must be at most {}", MAX_EXPAND_DAYS)));
    }

    let through = Utc::now().with_timezone(&ctx.zone).date_naive() + Duration::days(i64::from(days));

    let db = ctx.lock_db()?;
    let session = db
        .get_session(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("medication session {}", id)))?;
    if !session.active {
        return Err(ApiError::BadRequest("session is inactive".into()));
    }

    let created = DoseTracker::new(&db, ctx.zone).expand_session(&session, through)?;
    Ok(Json(ExpandResponse {
        session_id: id,
        through,
        created,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TrackingRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// `GET /api/medications/sessions/:id/tracking?from=&to=`
pub async fn session_tracking(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    query: Result<Query<TrackingRangeQuery>, QueryRejection>,
) -> Result<Json<Vec<MedicationTrackingRecord>>, ApiError> {
    let id = parse_id(&id)?;
    let Query(query) = query?;

    let db = ctx.lock_db()?;
    if db.get_session(&id)?.is_none() {
        return Err(ApiError::NotFound(format!("medication session {}", id)));
    }
    let records = db.list_tracking_for_session(&id, query.from, query.to)?;
    Ok(Json(records))
}
