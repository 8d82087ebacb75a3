use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Serialize;

use crate::{app_state::AppState, db::bootstrap};

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'a str,
}

async fn healthz() -> impl IntoResponse {
    metrics::counter!("health_checks_total", "endpoint" => "healthz", "status" => "ok")
        .increment(1);
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

async fn readyz(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    if let Some(pool) = state.pool.as_ref() {
        match bootstrap::ensure_readiness(pool).await {
            Ok(()) => {
                metrics::counter!(
                    "health_checks_total",
                    "endpoint" => "readyz",
                    "status" => "ok"
                )
                .increment(1);
                (StatusCode::OK, Json(HealthResponse { status: "ready" }))
            }
            Err(_) => {
                metrics::counter!(
                    "health_checks_total",
                    "endpoint" => "readyz",
                    "status" => "error"
                )
                .increment(1);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(HealthResponse { status: "degraded" }),
                )
            }
        }
    } else {
        metrics::counter!(
            "health_checks_total",
            "endpoint" => "readyz",
            "status" => "error"
        )
        .increment(1);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "no_db" }),
        )
    }
}

pub fn create_health_router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
