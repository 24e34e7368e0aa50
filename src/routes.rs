//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets/propagates X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response spans
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Edge Gate     │ ← 403 bad origin, 429 over quota, security headers
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Catch Panic    │ ← 500 instead of a dropped connection
//! └────────┬─────────┘
//!          ▼
//!   /health  or  static site (ServeDir)
//! ```
//!
//! The panic guard sits inside the gate so a 500 still leaves with the
//! security headers attached.

use std::any::Any;

use axum::Router;
use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{EdgeGate, EdgeGateLayer, OriginPolicy};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// - `/health` answers from [`handlers::health_check`]
/// - every other path is served from `config.static_dir`, with `404.html`
///   from that directory as the not-found page
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let site = ServeDir::new(&config.static_dir)
        .not_found_service(ServeFile::new(config.static_dir.join("404.html")));

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .fallback_service(site);

    let router = with_gate(router, edge_gate(&state))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    router.with_state(state)
}

/// Build the gate from application state.
pub fn edge_gate(state: &AppState) -> EdgeGate {
    let config = &state.config;

    info!(
        origins = config.allowed_origins.len(),
        "Origin allowlist configured"
    );
    match &state.limiter {
        Some(limiter) => info!(
            limit = limiter.limit(),
            window_ms = limiter.window().as_millis() as u64,
            bypass_paths = ?config.rate_limit_bypass_paths,
            "Rate limiting enabled"
        ),
        None => info!("Rate limiting disabled (RATE_LIMIT=0)"),
    }

    EdgeGate::new(
        OriginPolicy::new(&config.allowed_origins),
        state.limiter.clone(),
        config.rate_limit_bypass_paths.clone(),
    )
}

/// Wrap every route of `router` in the panic guard and then the gate.
pub fn with_gate<S>(router: Router<S>, gate: EdgeGate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(EdgeGateLayer::new(gate))
}

/// Fail closed: a panicking handler becomes a generic 500.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
