//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables. Defaults match the
//! production site, so an empty environment gives the standard gate. A `.env`
//! file in the working directory is read first if present.
//!
//! # Gate Configuration
//!
//! - `RATE_LIMIT`: Requests per client per window (default: 10, 0 disables)
//! - `RATE_LIMIT_WINDOW_MS`: Window length in milliseconds (default: 60000)
//! - `RATE_LIMIT_BYPASS_PATHS`: Exact paths exempt from rate limiting (default: `/health`)
//! - `ALLOWED_ORIGINS`: Comma-separated origin allowlist
//! - `SWEEP_INTERVAL_SECS`: Background sweep of idle clients (default: 0 = off)
//!
//! # Serving
//!
//! - `HOST`, `PORT`: Bind address (default: `0.0.0.0:3000`)
//! - `STATIC_DIR`: Directory holding the built site (default: `public`)
//! - `METRICS_PORT`: Prometheus listener port (default: 9090, 0 = off)

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::limiter::{DEFAULT_RATE_LIMIT, DEFAULT_WINDOW};
use crate::middleware::origin::DEFAULT_ALLOWED_ORIGINS;

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Gate listening on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Root of the pre-built site served behind the gate (default: "public")
    pub static_dir: PathBuf,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Requests admitted per client per window (default: 10)
    /// Set to 0 to disable rate limiting
    pub rate_limit: u32,

    /// Window length (default: 60 seconds)
    pub rate_limit_window: Duration,

    /// Paths that skip rate limiting. Exact match on the request path.
    /// Default: ["/health"] so load balancer probes are never throttled.
    pub rate_limit_bypass_paths: Vec<String>,

    /// Interval for the background sweep of expired clients.
    /// Zero disables it; the per-request sweep always runs.
    pub sweep_interval: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Origins allowed to make cross-origin requests.
    /// Requests with any other non-empty `Origin` header get a 403.
    pub allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with production defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a value fails to parse or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),

            rate_limit: Self::parse_env("RATE_LIMIT", DEFAULT_RATE_LIMIT)?,
            rate_limit_window: Duration::from_millis(Self::parse_env(
                "RATE_LIMIT_WINDOW_MS",
                60_000,
            )?),
            rate_limit_bypass_paths: Self::parse_bypass_paths(),
            sweep_interval: Duration::from_secs(Self::parse_env("SWEEP_INTERVAL_SECS", 0)?),

            allowed_origins: Self::parse_allowed_origins(),

            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_MS must be greater than 0".to_string(),
            ));
        }

        if let Some(origin) = self
            .allowed_origins
            .iter()
            .find(|o| !(o.starts_with("https://") || o.starts_with("http://")))
        {
            return Err(AppError::ConfigError(format!(
                "ALLOWED_ORIGINS entry '{origin}' must be a full http(s) origin"
            )));
        }

        if let Some(origin) = self.allowed_origins.iter().find(|o| o.ends_with('/')) {
            return Err(AppError::ConfigError(format!(
                "ALLOWED_ORIGINS entry '{origin}' must not end with '/'"
            )));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if rate limiting is enabled.
    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit > 0
    }

    /// Check if the background sweeper should run.
    pub fn background_sweep_enabled(&self) -> bool {
        self.rate_limiting_enabled() && !self.sweep_interval.is_zero()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Split a comma-separated list, trimming entries and dropping empty ones.
    fn split_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Parse the origin allowlist from environment variable.
    fn parse_allowed_origins() -> Vec<String> {
        env::var("ALLOWED_ORIGINS")
            .map(|raw| Self::split_list(&raw))
            .unwrap_or_else(|_| default_allowed_origins())
    }

    /// Parse rate-limit bypass paths from environment variable.
    ///
    /// Entries not starting with `/` are dropped.
    fn parse_bypass_paths() -> Vec<String> {
        Self::split_list(&env::var("RATE_LIMIT_BYPASS_PATHS").unwrap_or_else(|_| "/health".to_string()))
            .into_iter()
            .filter(|p| p.starts_with('/'))
            .collect()
    }
}

fn default_allowed_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS
        .iter()
        .map(|o| (*o).to_string())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_limit_window: DEFAULT_WINDOW,
            rate_limit_bypass_paths: vec!["/health".to_string()],
            sweep_interval: Duration::ZERO,
            allowed_origins: default_allowed_origins(),
            metrics_port: 9090,
        }
    }
}
