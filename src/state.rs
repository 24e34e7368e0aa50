//! Shared application state for Axum handlers and the gate.
//!
//! - **Configuration**: runtime configuration access
//! - **Limiter**: the process-wide rate-limit table, shared with the gate
//! - **Background sweeper**: optional timer-driven removal of idle clients
//!
//! # Structured Concurrency
//!
//! The sweeper is spawned on a `tokio_util::task::TaskTracker` and stopped
//! through a `CancellationToken`. Call `shutdown()` before exit to wait for it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::limiter::{Clock, InMemoryStore, RateLimitStore, SlidingWindowLimiter, SystemClock};
use crate::metrics;

/// Shared application state.
///
/// Cheap to clone; everything inside is behind an `Arc` or is itself a
/// shared handle.
///
/// ```rust,ignore
/// let state = AppState::new(config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Rate limiter, `None` when `RATE_LIMIT=0`
    pub limiter: Option<Arc<SlidingWindowLimiter>>,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create state with an in-memory table and the system clock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Limiter` if the limiter settings are invalid.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create state with an in-memory table and an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Limiter` if the limiter settings are invalid.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> AppResult<Self> {
        Self::with_parts(config, Arc::new(InMemoryStore::new()), clock)
    }

    /// Create state over an explicit store and clock.
    ///
    /// # Background Tasks
    ///
    /// Spawns the sweeper when `config.sweep_interval` is non-zero, which
    /// requires a running Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Limiter` if the limiter settings are invalid.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let limiter = if config.rate_limiting_enabled() {
            Some(Arc::new(SlidingWindowLimiter::with_parts(
                config.rate_limit,
                config.rate_limit_window,
                store,
                clock,
            )?))
        } else {
            None
        };

        let state = Self {
            config: Arc::new(config),
            limiter,
            started_at: Instant::now(),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        if state.config.background_sweep_enabled() {
            state.spawn_sweep_task(state.config.sweep_interval);
        }

        Ok(state)
    }

    /// Clients currently held in the rate-limit table.
    pub fn tracked_clients(&self) -> usize {
        self.limiter
            .as_ref()
            .map_or(0, |limiter| limiter.tracked_clients())
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Spawn the background sweeper.
    ///
    /// Requests already sweep the table; this only frees entries of clients
    /// that went quiet, so memory does not wait for the next request.
    fn spawn_sweep_task(&self, every: Duration) {
        let Some(limiter) = self.limiter.clone() else {
            return;
        };
        let cancel = self.cancellation_token.clone();

        info!(interval_secs = every.as_secs(), "Background rate limit sweep enabled");

        self.task_tracker.spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        metrics::set_tracked_clients(limiter.tracked_clients());
                        debug!(removed, "Background sweep finished");
                    }
                }
            }

            debug!("Sweep task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }
}
