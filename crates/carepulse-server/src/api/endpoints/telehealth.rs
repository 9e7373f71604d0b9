//! Telehealth queue endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use carepulse_core::{Database, TelehealthVisit, VisitPriority, VisitStatus};

use super::{parse_id, required};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};

/// `GET /api/telehealth/queue`: waiting visits, urgent first.
pub async fn queue(State(ctx): State<ApiContext>) -> Result<Json<Vec<TelehealthVisit>>, ApiError> {
    Ok(Json(ctx.lock_db()?.list_waiting_visits()?))
}

#[derive(Debug, Deserialize)]
pub struct CreateVisitRequest {
    pub patient_id: String,
    pub reason: String,
    #[serde(default)]
    pub priority: Option<VisitPriority>,
}

/// `POST /api/telehealth/visits`: join the queue.
pub async fn create_visit(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CreateVisitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TelehealthVisit>), ApiError> {
    let Json(request) = payload?;
    let visit = TelehealthVisit::new(
        parse_id(&request.patient_id)?,
        required("reason", &request.reason)?,
        request.priority.unwrap_or(VisitPriority::Routine),
    );

    let db = ctx.lock_db()?;
    if db.get_patient(&visit.patient_id)?.is_none() {
        return Err(ApiError::NotFound(format!("patient {}", visit.patient_id)));
    }
    db.insert_visit(&visit)?;

    tracing::info!(visit_id = %visit.id, priority = %visit.priority, caller = %caller.caller_id, "Telehealth visit queued");
    Ok((StatusCode::CREATED, Json(visit)))
}

/// Apply the first transition whose source state matches.
fn transition(
    db: &Database,
    id: &str,
    from: &[VisitStatus],
    to: VisitStatus,
    actor: &str,
) -> Result<TelehealthVisit, ApiError> {
    let now = Utc::now();
    for status in from {
        if db.transition_visit(id, *status, to, actor, now)? {
            return db
                .get_visit(id)?
                .ok_or_else(|| ApiError::NotFound(format!("telehealth visit {}", id)));
        }
    }

    match db.get_visit(id)? {
        None => Err(ApiError::NotFound(format!("telehealth visit {}", id))),
        Some(visit) => Err(ApiError::BadRequest(format!(
            "visit is {} and cannot become {}",
            visit.status, to
        ))),
    }
}

/// `POST /api/telehealth/visits/:id/start`: clinician picks up a waiting visit.
pub async fn start(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<TelehealthVisit>, ApiError> {
    let id = parse_id(&id)?;
    let visit = transition(
        &*ctx.lock_db()?,
        &id,
        &[VisitStatus::Waiting],
        VisitStatus::InProgress,
        &caller.caller_id,
    )?;
    Ok(Json(visit))
}

/// `POST /api/telehealth/visits/:id/complete`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<TelehealthVisit>, ApiError> {
    let id = parse_id(&id)?;
    let visit = transition(
        &*ctx.lock_db()?,
        &id,
        &[VisitStatus::InProgress],
        VisitStatus::Completed,
        &caller.caller_id,
    )?;
    Ok(Json(visit))
}

/// `POST /api/telehealth/visits/:id/cancel`: from waiting or in progress.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<TelehealthVisit>, ApiError> {
    let id = parse_id(&id)?;
    let visit = transition(
        &*ctx.lock_db()?,
        &id,
        &[VisitStatus::Waiting, VisitStatus::InProgress],
        VisitStatus::Cancelled,
        &caller.caller_id,
    )?;
    Ok(Json(visit))
}
