//! Origin allowlist enforcement.
//!
//! Browsers attach `Origin` to cross-origin requests (and to same-origin
//! POSTs). A request whose non-empty `Origin` is not on the allowlist is
//! rejected with 403. Requests without the header (same-origin navigation,
//! curl, server-to-server calls) always pass.
//!
//! Matching is exact and byte-for-byte: scheme, host and port must all match,
//! with no trailing slash.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::ORIGIN;

use crate::error::{AppError, AppResult};

/// Origins allowed by default: the production site and local development.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "https://renekuhm.com",
    "https://www.renekuhm.com",
    "http://localhost:3000",
];

/// Fixed set of origins permitted to call the site cross-origin.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<[String]>,
}

impl OriginPolicy {
    pub fn new(origins: &[String]) -> Self {
        Self {
            allowed: origins.iter().cloned().collect(),
        }
    }

    /// Whether `origin` is on the allowlist.
    pub fn is_allowed(&self, origin: &[u8]) -> bool {
        self.allowed.iter().any(|o| o.as_bytes() == origin)
    }

    /// Check the `Origin` header of a request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::OriginRejected`] when the header is present,
    /// non-empty and not allowlisted.
    pub fn check(&self, headers: &HeaderMap) -> AppResult<()> {
        let Some(origin) = headers.get(ORIGIN) else {
            return Ok(());
        };

        let bytes = origin.as_bytes();
        if bytes.is_empty() || self.is_allowed(bytes) {
            return Ok(());
        }

        Err(AppError::OriginRejected {
            origin: String::from_utf8_lossy(bytes).into_owned(),
        })
    }

    /// The configured origins.
    pub fn origins(&self) -> &[String] {
        &self.allowed
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| (*o).to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn test_allowlisted_origin_passes() {
        let policy = OriginPolicy::default();
        assert!(policy.check(&headers_with_origin("https://renekuhm.com")).is_ok());
        assert!(policy.check(&headers_with_origin("http://localhost:3000")).is_ok());
    }

    #[test]
    fn test_unknown_origin_rejected() {
        let policy = OriginPolicy::default();
        let err = policy
            .check(&headers_with_origin("https://evil.example"))
            .unwrap_err();

        assert!(matches!(err, AppError::OriginRejected { ref origin } if origin == "https://evil.example"));
    }

    #[test]
    fn test_missing_origin_passes() {
        assert!(OriginPolicy::default().check(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_empty_origin_passes() {
        assert!(OriginPolicy::default().check(&headers_with_origin("")).is_ok());
    }

    #[test]
    fn test_match_is_exact() {
        let policy = OriginPolicy::default();
        for origin in [
            "https://renekuhm.com/",
            "http://renekuhm.com",
            "https://renekuhm.com:8443",
            "https://RENEKUHM.com",
            "https://renekuhm.com.evil.example",
            "null",
        ] {
            assert!(policy.check(&headers_with_origin(origin)).is_err(), "{origin}");
        }
    }

    #[test]
    fn test_custom_allowlist() {
        let policy = OriginPolicy::new(&["https://staging.renekuhm.com".to_string()]);
        assert!(policy.check(&headers_with_origin("https://staging.renekuhm.com")).is_ok());
        assert!(policy.check(&headers_with_origin("https://renekuhm.com")).is_err());
        assert_eq!(policy.origins().len(), 1);
    }
}
