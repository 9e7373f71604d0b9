//! Patient endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use carepulse_core::{Patient, PatientStatus};

use super::{clamp_limit, parse_id, required};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};

#[derive(Debug, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /api/patients?search=&limit=`
pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<PatientListQuery>, QueryRejection>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let Query(query) = query?;
    let limit = clamp_limit(query.limit);
    let db = ctx.lock_db()?;

    let patients = match query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => db.search_patients(search, limit)?,
        None => db.list_patients(limit)?,
    };
    Ok(Json(patients))
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CreatePatientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(request) = payload?;

    let mut patient = Patient::new(required("full_name", &request.full_name)?);
    patient.date_of_birth = request.date_of_birth;
    patient.email = request.email;
    patient.phone = request.phone;

    ctx.lock_db()?.insert_patient(&patient)?;

    tracing::info!(patient_id = %patient.id, caller = %caller.caller_id, "Patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/patients/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id)?;
    let patient = ctx
        .lock_db()?
        .get_patient(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("patient {}", id)))?;
    Ok(Json(patient))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<PatientStatus>,
}

/// `PUT /api/patients/:id`: fields left out are unchanged.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePatientRequest>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;

    let db = ctx.lock_db()?;
    let mut patient = db
        .get_patient(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("patient {}", id)))?;

    if let Some(name) = request.full_name {
        patient.full_name = required("full_name", &name)?;
    }
    if request.date_of_birth.is_some() {
        patient.date_of_birth = request.date_of_birth;
    }
    if request.email.is_some() {
        patient.email = request.email;
    }
    if request.phone.is_some() {
        patient.phone = request.phone;
    }
    if let Some(status) = request.status {
        patient.status = status;
    }
    patient.updated_at = Utc::now();

    db.update_patient(&patient)?;

    tracing::info!(patient_id = %id, caller = %caller.caller_id, "Patient updated");
    Ok(Json(patient))
}

/// `DELETE /api/patients/:id`: refused while medication history exists.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !ctx.lock_db()?.delete_patient(&id)? {
        return Err(ApiError::NotFound(format!("patient {}", id)));
    }

    tracing::info!(patient_id = %id, caller = %caller.caller_id, "Patient deleted");
    Ok(StatusCode::NO_CONTENT)
}
