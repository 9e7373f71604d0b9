//! Vital reading endpoints, nested under a patient.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use carepulse_core::{VitalKind, VitalReading};

use super::{clamp_limit, parse_id};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};

#[derive(Debug, Deserialize)]
pub struct VitalListQuery {
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /api/patients/:id/vitals?kind=&limit=`: newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
    query: Result<Query<VitalListQuery>, QueryRejection>,
) -> Result<Json<Vec<VitalReading>>, ApiError> {
    let patient_id = parse_id(&patient_id)?;
    let Query(query) = query?;
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<VitalKind>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let db = ctx.lock_db()?;
    if db.get_patient(&patient_id)?.is_none() {
        return Err(ApiError::NotFound(format!("patient {}", patient_id)));
    }
    let readings = db.list_vitals(&patient_id, kind, clamp_limit(query.limit))?;
    Ok(Json(readings))
}

#[derive(Debug, Deserialize)]
pub struct RecordVitalRequest {
    pub kind: VitalKind,
    pub value: f64,
    #[serde(default)]
    pub secondary_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// `POST /api/patients/:id/vitals`
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(patient_id): Path<String>,
    payload: Result<Json<RecordVitalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VitalReading>), ApiError> {
    let patient_id = parse_id(&patient_id)?;
    let Json(request) = payload?;

    if !request.value.is_finite() || request.secondary_value.is_some_and(|v| !v.is_finite()) {
        return Err(ApiError::BadRequest("reading values must be finite numbers".into()));
    }

    let mut reading = VitalReading::new(patient_id, request.kind, request.value);
    reading.secondary_value = request.secondary_value;
    reading.device_id = request.device_id.as_deref().map(parse_id).transpose()?;
    if let Some(unit) = request.unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
        reading.unit = unit;
    }
    if let Some(recorded_at) = request.recorded_at {
        reading.recorded_at = recorded_at;
    }

    let db = ctx.lock_db()?;
    if db.get_patient(&reading.patient_id)?.is_none() {
        return Err(ApiError::NotFound(format!("patient {}", reading.patient_id)));
    }
    db.record_vital(&reading)?;

    tracing::debug!(reading_id = %reading.id, kind = %reading.kind, caller = %caller.caller_id, "Vital recorded");
    Ok((StatusCode::CREATED, Json(reading)))
}
