//! Monitoring device endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use carepulse_core::{Database, Device, DeviceStatus};

use super::{parse_id, required};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};

#[derive(Debug, Deserialize)]
pub struct DeviceListQuery {
    pub patient_id: Option<String>,
}

/// `GET /api/devices?patient_id=`
pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<DeviceListQuery>, QueryRejection>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let Query(query) = query?;
    let patient_id = query.patient_id.as_deref().map(parse_id).transpose()?;

    let devices = ctx.lock_db()?.list_devices(patient_id.as_deref())?;
    Ok(Json(devices))
}

#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    pub device_type: String,
    pub serial_number: String,
    #[serde(default)]
    pub patient_id: Option<String>,
}

fn ensure_patient(db: &Database, patient_id: &str) -> Result<(), ApiError> {
    match db.get_patient(patient_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("patient {}", patient_id))),
    }
}

/// `POST /api/devices`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let Json(request) = payload?;

    let mut device = Device::new(
        required("device_type", &request.device_type)?,
        required("serial_number", &request.serial_number)?,
    );
    device.patient_id = request.patient_id.as_deref().map(parse_id).transpose()?;

    let db = ctx.lock_db()?;
    if let Some(patient_id) = &device.patient_id {
        ensure_patient(&db, patient_id)?;
    }
    db.insert_device(&device)?;

    tracing::info!(device_id = %device.id, serial = %device.serial_number, caller = %caller.caller_id, "Device registered");
    Ok((StatusCode::CREATED, Json(device)))
}

/// `GET /api/devices/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let id = parse_id(&id)?;
    let device = ctx
        .lock_db()?
        .get_device(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("device {}", id)))?;
    Ok(Json(device))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeviceRequest {
    pub device_type: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<DeviceStatus>,
    /// Assign to this patient
    pub patient_id: Option<String>,
    /// Remove the current assignment
    #[serde(default)]
    pub unassign: bool,
}

/// `PUT /api/devices/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDeviceRequest>, JsonRejection>,
) -> Result<Json<Device>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    if request.unassign && request.patient_id.is_some() {
        return Err(ApiError::BadRequest("patient_id and unassign are exclusive".into()));
    }

    let db = ctx.lock_db()?;
    let mut device = db
        .get_device(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("device {}", id)))?;

    if let Some(device_type) = request.device_type {
        device.device_type = required("device_type", &device_type)?;
    }
    if let Some(serial) = request.serial_number {
        device.serial_number = required("serial_number", &serial)?;
    }
    if let Some(status) = request.status {
        device.status = status;
    }
    if let Some(patient_id) = request.patient_id {
        let patient_id = parse_id(&patient_id)?;
        ensure_patient(&db, &patient_id)?;
        device.patient_id = Some(patient_id);
    } else if request.unassign {
        device.patient_id = None;
    }

    db.update_device(&device)?;

    tracing::info!(device_id = %id, caller = %caller.caller_id, "Device updated");
    Ok(Json(device))
}

/// `DELETE /api/devices/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !ctx.lock_db()?.delete_device(&id)? {
        return Err(ApiError::NotFound(format!("device {}", id)));
    }

    tracing::info!(device_id = %id, caller = %caller.caller_id, "Device deleted");
    Ok(StatusCode::NO_CONTENT)
}
