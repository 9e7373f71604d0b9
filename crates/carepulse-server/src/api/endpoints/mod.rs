//! Endpoint handlers, one module per resource.

pub mod devices;
pub mod health;
pub mod medications;
pub mod patients;
pub mod posts;
pub mod reports;
pub mod telehealth;
pub mod vitals;

use uuid::Uuid;

use crate::api::error::ApiError;

/// Default page size for list endpoints.
pub(crate) const DEFAULT_LIMIT: usize = 50;
/// Largest page a client may request.
pub(crate) const MAX_LIMIT: usize = 500;

/// Validate a path identifier. All ids are UUIDs.
pub(crate) fn parse_id(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("identifier is required".into()));
    }
    Uuid::parse_str(trimmed)
        .map(|id| id.to_string())
        .map_err(|_| ApiError::BadRequest(format!("malformed identifier: {}", trimmed)))
}

pub(crate) fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Reject blank required text fields.
pub(crate) fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::BadRequest(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}
