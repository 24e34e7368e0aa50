use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON body for error responses.
///
/// A single `error` field, the shape the site's frontend already parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("healthy")
    pub status: String,
    /// Crate version
    pub version: String,
    /// When this response was produced
    pub timestamp: DateTime<Utc>,
    /// Seconds since the process started
    pub uptime_seconds: u64,
    /// Clients currently held in the rate-limit table (0 when limiting is off)
    pub tracked_clients: usize,
}
