//! End-to-end API flows against an in-memory database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, FixedOffset, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use carepulse_content::MockCompleter;
use carepulse_core::Database;
use carepulse_server::{api_router, ApiContext};

const CALLER: &str = "nurse-7";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    api_router(ApiContext::new(db, FixedOffset::east_opt(0).unwrap(), Arc::new(MockCompleter)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Caller-Id", CALLER);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_patient(app: &Router) -> String {
    let (status, patient) =
        send_json(app, "POST", "/api/patients", Some(json!({"full_name": "Grace Hopper"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    patient["id"].as_str().unwrap().to_string()
}

/// Session that started yesterday with a single 08:00 dose, expanded through tomorrow.
async fn session_with_slots(app: &Router, patient_id: &str) -> (String, Vec<Value>) {
    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    let (status, session) = send_json(
        app,
        "POST",
        "/api/medications/sessions",
        Some(json!({
            "patient_id": patient_id,
            "medication_name": "Lisinopril",
            "dosage": "10mg",
            "frequency": "daily",
            "times_of_day": ["08:00:00"],
            "start_date": yesterday,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["id"].as_str().unwrap().to_string();

    let (status, expanded) = send_json(
        app,
        "POST",
        &format!("/api/medications/sessions/{}/expand?days=1", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expanded["created"], 3);

    let (status, records) = send_json(
        app,
        "GET",
        &format!("/api/medications/sessions/{}/tracking", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = records.as_array().unwrap().clone();
    assert_eq!(records.len(), 3);
    (session_id, records)
}

#[tokio::test]
async fn take_after_grace_window_is_late_then_overtaken() {
    let app = app();
    let patient_id = create_patient(&app).await;
    let (_, records) = session_with_slots(&app, &patient_id).await;
    let yesterday_slot = records[0]["id"].as_str().unwrap().to_string();

    let (status, taken) = send_json(
        &app,
        "POST",
        &format!("/api/medications/take/{}", yesterday_slot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(taken["status"], "late");
    assert_eq!(taken["dose_count"], 1);
    assert_eq!(taken["recorded_by"], CALLER);
    assert!(taken["taken_at"].is_string());

    let (status, extra) = send_json(
        &app,
        "POST",
        &format!("/api/medications/track/{}", yesterday_slot),
        Some(json!({"status": "overtaken", "notes": "Second tablet by mistake"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extra["status"], "overtaken");
    assert_eq!(extra["dose_count"], 2);
    assert_eq!(extra["notes"], "Second tablet by mistake");
}

#[tokio::test]
async fn track_rejects_unknown_status() {
    let app = app();
    let patient_id = create_patient(&app).await;
    let (_, records) = session_with_slots(&app, &patient_id).await;
    let slot = records[2]["id"].as_str().unwrap();

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/medications/track/{}", slot),
        Some(json!({"status": "skipped"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (_, record) = send_json(&app, "GET", &format!("/api/medications/tracking/{}", slot), None).await;
    assert_eq!(record["status"], "pending");
    assert_eq!(record["dose_count"], 0);
}

#[tokio::test]
async fn take_unknown_record_is_not_found() {
    let app = app();
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/medications/take/{}", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn dose_actions_require_caller() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/medications/take/{}", uuid::Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn overdue_slot_reads_missed_after_any_write() {
    let app = app();
    let patient_id = create_patient(&app).await;
    let (_, records) = session_with_slots(&app, &patient_id).await;
    let yesterday_slot = records[0]["id"].as_str().unwrap();
    let tomorrow_slot = records[2]["id"].as_str().unwrap();

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/medications/track/{}", tomorrow_slot),
        Some(json!({"status": "pending", "notes": "Travelling"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, record) = send_json(
        &app,
        "GET",
        &format!("/api/medications/tracking/{}", yesterday_slot),
        None,
    )
    .await;
    assert_eq!(record["status"], "missed");
    assert!(record["taken_at"].is_null());
}

#[tokio::test]
async fn adherence_report_as_csv() {
    let app = app();
    let patient_id = create_patient(&app).await;
    let (_, records) = session_with_slots(&app, &patient_id).await;
    let slot = records[0]["id"].as_str().unwrap();
    send_json(&app, "POST", &format!("/api/medications/take/{}", slot), None).await;

    let (status, bytes) = send(
        &app,
        "GET",
        &format!("/api/reports/adherence?patient_id={}&format=csv", patient_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(bytes).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("session_id,patient_id,medication_name"));
    let row = lines.next().unwrap();
    assert!(row.contains("Lisinopril"));
    assert!(lines.next().is_none());

    let (status, _) = send(&app, "GET", "/api/reports/adherence?format=xml", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        "/api/reports/adherence?from=2024-05-02&to=2024-05-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn drafted_articles_get_unique_slugs() {
    let app = app();
    let request = json!({"topic": "sleep hygiene", "audience": "older adults"});

    let (status, first) = send_json(&app, "POST", "/api/posts/draft", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["title"], "Sleep Hygiene");
    assert_eq!(first["slug"], "sleep-hygiene");
    assert_eq!(first["status"], "draft");
    assert_eq!(first["author"], CALLER);

    let (_, second) = send_json(&app, "POST", "/api/posts/draft", Some(request)).await;
    assert_eq!(second["slug"], "sleep-hygiene-2");

    let id = first["id"].as_str().unwrap();
    let (status, published) = send_json(&app, "POST", &format!("/api/posts/{}/publish", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "published");

    let (status, _) = send_json(&app, "POST", &format!("/api/posts/{}/publish", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = send_json(&app, "GET", "/api/posts?status=published", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn telehealth_visit_lifecycle() {
    let app = app();
    let patient_id = create_patient(&app).await;

    let (status, visit) = send_json(
        &app,
        "POST",
        "/api/telehealth/visits",
        Some(json!({"patient_id": patient_id, "reason": "Dizziness", "priority": "urgent"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let visit_id = visit["id"].as_str().unwrap();

    let (_, queue) = send_json(&app, "GET", "/api/telehealth/queue", None).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, started) =
        send_json(&app, "POST", &format!("/api/telehealth/visits/{}/start", visit_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "in_progress");
    assert_eq!(started["assigned_to"], CALLER);

    let (status, _) =
        send_json(&app, "POST", &format!("/api/telehealth/visits/{}/start", visit_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, completed) =
        send_json(&app, "POST", &format!("/api/telehealth/visits/{}/complete", visit_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    let (_, queue) = send_json(&app, "GET", "/api/telehealth/queue", None).await;
    assert!(queue.as_array().unwrap().is_empty());
}
