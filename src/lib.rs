//! # Edge Gate
//!
//! Request gate that sits in front of a static marketing site:
//!
//! - **Security headers**: a fixed header set on every response
//! - **Caching**: long-lived immutable caching for fingerprinted assets
//! - **Origin allowlist**: cross-origin requests from unknown sites get 403
//! - **Rate limiting**: per-client sliding window, 429 with a JSON body
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Request ID → Trace → EdgeGate → CatchPanic                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  /health            │  static site (ServeDir + 404.html)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SlidingWindowLimiter (RateLimitStore + Clock)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edge_gate::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config)?;
//!     let app = build_router(state.clone());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     state.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Gating an existing router
//!
//! ```rust
//! use axum::{Router, routing::get};
//! use edge_gate::{EdgeGate, EdgeGateLayer, OriginPolicy, SlidingWindowLimiter};
//! use std::{sync::Arc, time::Duration};
//!
//! let limiter = SlidingWindowLimiter::new(10, Duration::from_secs(60)).unwrap();
//! let gate = EdgeGate::new(OriginPolicy::default(), Some(Arc::new(limiter)), Vec::new());
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "hola" }))
//!     .layer(EdgeGateLayer::new(gate));
//! ```
//!
//! ## Configuration
//!
//! ```bash
//! RATE_LIMIT=20 RATE_LIMIT_WINDOW_MS=30000 STATIC_DIR=./dist cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use limiter::SlidingWindowLimiter;
pub use middleware::{EdgeGate, EdgeGateLayer, OriginPolicy};
pub use routes::build_router;
pub use state::AppState;
