//! Health endpoint.
//!
//! `GET /health` always answers 200 with a small JSON status document. It is
//! exempt from rate limiting by default so probes from a shared address never
//! trip the limiter, and it sets `Cache-Control: no-store` so the gate's
//! default caching does not apply.

use axum::Json;
use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::instrument;

use crate::middleware::NO_STORE_CACHE_CONTROL;
use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2026-01-15T10:30:00Z",
///   "uptime_seconds": 3600,
///   "tracked_clients": 12
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.uptime_seconds(),
        tracked_clients: state.tracked_clients(),
    };

    ([(CACHE_CONTROL, NO_STORE_CACHE_CONTROL)], Json(body))
}
