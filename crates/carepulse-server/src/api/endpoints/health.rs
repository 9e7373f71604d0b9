//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub schema_version: u32,
    pub version: &'static str,
}

/// `GET /api/health`: liveness and schema version. No caller required.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let schema_version = ctx.lock_db()?.schema_version()?;

    Ok(Json(HealthResponse {
        status: "ok",
        schema_version,
        version: env!("CARGO_PKG_VERSION"),
    }))
}
