//! API router.
//!
//! Everything is nested under `/api/`. Only `/api/health` is open; every other
//! route requires an `X-Caller-Id` header.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        // Patients, devices, vitals
        .route("/patients", get(endpoints::patients::list).post(endpoints::patients::create))
        .route(
            "/patients/:id",
            get(endpoints::patients::get)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route(
            "/patients/:id/vitals",
            get(endpoints::vitals::list).post(endpoints::vitals::record),
        )
        .route("/devices", get(endpoints::devices::list).post(endpoints::devices::create))
        .route(
            "/devices/:id",
            get(endpoints::devices::get)
                .put(endpoints::devices::update)
                .delete(endpoints::devices::delete),
        )
        // Telehealth
        .route("/telehealth/queue", get(endpoints::telehealth::queue))
        .route("/telehealth/visits", post(endpoints::telehealth::create_visit))
        .route("/telehealth/visits/:id/start", post(endpoints::telehealth::start))
        .route("/telehealth/visits/:id/complete", post(endpoints::telehealth::complete))
        .route("/telehealth/visits/:id/cancel", post(endpoints::telehealth::cancel))
        // Dose actions
        .route("/medications/take", post(endpoints::medications::missing_id))
        .route("/medications/take/", post(endpoints::medications::missing_id))
        .route("/medications/take/:id", post(endpoints::medications::take))
        .route("/medications/track", post(endpoints::medications::missing_id))
        .route("/medications/track/", post(endpoints::medications::missing_id))
        .route("/medications/track/:id", post(endpoints::medications::track))
        // Sessions and tracking records
        .route(
            "/medications/sessions",
            get(endpoints::medications::list_sessions).post(endpoints::medications::create_session),
        )
        .route("/medications/sessions/:id", get(endpoints::medications::get_session))
        .route(
            "/medications/sessions/:id/deactivate",
            post(endpoints::medications::deactivate_session),
        )
        .route(
            "/medications/sessions/:id/expand",
            post(endpoints::medications::expand_session),
        )
        .route(
            "/medications/sessions/:id/tracking",
            get(endpoints::medications::session_tracking),
        )
        .route("/medications/tracking/:id", get(endpoints::medications::tracking_record))
        // Reports
        .route("/reports/adherence", get(endpoints::reports::adherence))
        // Articles
        .route("/posts", get(endpoints::posts::list).post(endpoints::posts::create))
        .route("/posts/draft", post(endpoints::posts::draft))
        .route(
            "/posts/:id",
            get(endpoints::posts::get)
                .put(endpoints::posts::update)
                .delete(endpoints::posts::delete),
        )
        .route("/posts/:id/publish", post(endpoints::posts::publish))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::caller::require_caller));

    let open = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", open)
        .layer(TraceLayer::new_for_http())
}
