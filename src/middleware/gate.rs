//! Edge request gate.
//!
//! Runs in front of every route and decides, before any handler is invoked,
//! whether a request may proceed.
//!
//! # Pipeline
//!
//! ```text
//! Request
//!    │
//!    ▼
//! Origin allowlist ──not allowed──▶ 403 (empty body)
//!    │
//!    ▼
//! Rate limit (per client key) ──over quota──▶ 429 {"error": "..."}
//!    │
//!    ▼
//! Handler ──▶ security headers + Cache-Control ──▶ Response
//! ```
//!
//! Rejections carry the same security headers with `Cache-Control: no-store`.
//! Paths listed as bypass paths skip only the rate-limit step.
//!
//! # Concurrency
//!
//! All gate work is synchronous and finishes before the handler future is
//! created; no lock is held across an `.await`. Per-key atomicity of the
//! rate-limit update is provided by the store.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{trace, warn};

use super::ip::extract_client_key;
use super::origin::OriginPolicy;
use super::security_headers::{apply_rejection_headers, apply_response_headers, is_static_asset};
use crate::error::{AppError, AppResult};
use crate::limiter::{Admission, SlidingWindowLimiter};
use crate::metrics;

/// Decision logic shared by every clone of the gate service.
#[derive(Debug)]
pub struct EdgeGate {
    origins: OriginPolicy,
    limiter: Option<Arc<SlidingWindowLimiter>>,
    bypass_paths: Vec<String>,
}

impl EdgeGate {
    /// Create a gate.
    ///
    /// # Arguments
    ///
    /// * `origins` - Allowlist for the `Origin` header
    /// * `limiter` - Per-client limiter, or `None` to disable rate limiting
    /// * `bypass_paths` - Exact paths that skip rate limiting
    pub fn new(
        origins: OriginPolicy,
        limiter: Option<Arc<SlidingWindowLimiter>>,
        bypass_paths: Vec<String>,
    ) -> Self {
        Self {
            origins,
            limiter,
            bypass_paths,
        }
    }

    /// Run the origin and rate-limit checks for a request.
    ///
    /// # Errors
    ///
    /// - [`AppError::OriginRejected`] for a disallowed `Origin`
    /// - [`AppError::RateLimitExceeded`] when the client is over quota
    pub fn inspect<B>(&self, req: &Request<B>) -> AppResult<()> {
        self.origins.check(req.headers())?;

        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        let path = req.uri().path();
        if self.bypass_paths.iter().any(|p| p == path) {
            trace!(path = %path, "Rate limit bypassed");
            return Ok(());
        }

        let client_key = extract_client_key(req);
        match limiter.check(&client_key) {
            Admission::Allowed { count } => {
                trace!(client_key = %client_key, count, "Request admitted");
                Ok(())
            }
            Admission::Limited { retry_after } => Err(AppError::RateLimitExceeded {
                client_key: client_key.into_owned(),
                limit: limiter.limit(),
                retry_after,
            }),
        }
    }

    /// Turn a request into either a rejection response or an admission.
    ///
    /// Logs and counts the outcome.
    fn admit<B>(&self, req: &Request<B>) -> Result<(), Response<Body>> {
        match self.inspect(req) {
            Ok(()) => {
                metrics::record_gate_decision(metrics::outcome::ALLOWED);
                Ok(())
            }
            Err(err) => {
                let outcome = match &err {
                    AppError::OriginRejected { origin } => {
                        warn!(origin = %origin, path = %req.uri().path(), "Origin not allowed");
                        metrics::outcome::ORIGIN_REJECTED
                    }
                    AppError::RateLimitExceeded {
                        client_key,
                        retry_after,
                        ..
                    } => {
                        warn!(
                            client_key = %client_key,
                            path = %req.uri().path(),
                            retry_after_secs = retry_after.as_secs(),
                            "Rate limit exceeded"
                        );
                        metrics::outcome::RATE_LIMITED
                    }
                    _ => metrics::outcome::ERROR,
                };
                metrics::record_gate_decision(outcome);

                let mut response = err.into_response();
                apply_rejection_headers(response.headers_mut());
                Err(response)
            }
        }
    }
}

/// Edge gate layer for the Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let gate = EdgeGateLayer::new(EdgeGate::new(OriginPolicy::default(), Some(limiter), vec![]));
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(gate);
/// ```
#[derive(Clone)]
pub struct EdgeGateLayer {
    gate: Arc<EdgeGate>,
}

impl EdgeGateLayer {
    pub fn new(gate: EdgeGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}

impl<S> Layer<S> for EdgeGateLayer {
    type Service = EdgeGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EdgeGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Edge gate service wrapper.
#[derive(Clone)]
pub struct EdgeGateService<S> {
    inner: S,
    gate: Arc<EdgeGate>,
}

impl<S> Service<Request<Body>> for EdgeGateService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if let Err(rejection) = self.gate.admit(&req) {
            return Box::pin(async move { Ok(rejection) });
        }

        let static_asset = is_static_asset(req.uri().path());

        // Call the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            apply_response_headers(response.headers_mut(), static_asset);
            Ok(response)
        })
    }
}
