//! Client key extraction for rate limiting.
//!
//! The rate limiter buckets requests by a *client key* approximated from the
//! forwarding headers set by the hosting edge (CDN or reverse proxy).
//!
//! # Header Priority
//!
//! 1. `X-Forwarded-For`: first hop of the comma-separated list
//! 2. `X-Real-IP`
//! 3. Falls back to [`LOOPBACK_CLIENT_KEY`]
//!
//! An empty or whitespace-only value is skipped and the next source is tried.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **These headers are client-controlled** unless the edge in front of this
//! service overwrites them. Deployed directly on the internet, a client can
//! rotate `X-Forwarded-For` values to dodge the limiter or pin someone else's
//! address into the 429 state. Run behind a proxy that overwrites (not
//! appends to) the header:
//!
//! ```nginx
//! proxy_set_header X-Real-IP $remote_addr;
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! ## The Loopback Fallback
//!
//! Requests carrying neither header share the `127.0.0.1` key. On a correctly
//! fronted deployment that only happens for local traffic (health probes,
//! development), which is why `/health` bypasses the limiter by default.

use std::borrow::Cow;

use axum::http::{HeaderMap, Request};
use tracing::trace;

/// Client key used when no forwarding header identifies the client.
pub const LOOPBACK_CLIENT_KEY: &str = "127.0.0.1";

/// Forwarded-for header name.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Real-IP header name.
pub const X_REAL_IP: &str = "x-real-ip";

/// Where a client key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractedKey<'a> {
    /// First hop of `X-Forwarded-For`.
    FromXff(&'a str),
    /// `X-Real-IP` value.
    FromRealIp(&'a str),
    /// Neither header usable.
    NotFound,
}

/// Borrow the client key straight out of the headers. No allocation.
#[inline]
fn extract_key_from_headers(headers: &HeaderMap) -> ExtractedKey<'_> {
    // Format: "client, proxy1, proxy2" - the first entry is the client
    if let Some(forwarded) = headers.get(X_FORWARDED_FOR)
        && let Ok(value) = forwarded.to_str()
        && let Some(first_hop) = value.split(',').next().map(str::trim)
        && !first_hop.is_empty()
    {
        return ExtractedKey::FromXff(first_hop);
    }

    if let Some(real_ip) = headers.get(X_REAL_IP)
        && let Ok(value) = real_ip.to_str()
        && !value.trim().is_empty()
    {
        return ExtractedKey::FromRealIp(value.trim());
    }

    ExtractedKey::NotFound
}

/// Derive the client key from a header map.
///
/// Returns `Cow::Borrowed` for the loopback fallback and `Cow::Owned` for a
/// key read from a header.
pub fn client_key_from_headers(headers: &HeaderMap) -> Cow<'static, str> {
    match extract_key_from_headers(headers) {
        ExtractedKey::FromXff(key) => {
            trace!(client_key = %key, "Client key from X-Forwarded-For");
            Cow::Owned(key.to_string())
        }
        ExtractedKey::FromRealIp(key) => {
            trace!(client_key = %key, "Client key from X-Real-IP");
            Cow::Owned(key.to_string())
        }
        ExtractedKey::NotFound => Cow::Borrowed(LOOPBACK_CLIENT_KEY),
    }
}

/// Derive the client key for a request.
///
/// # Example
///
/// ```ignore
/// let key = extract_client_key(&req).into_owned();
/// limiter.check(&key);
/// ```
#[inline]
pub fn extract_client_key<B>(req: &Request<B>) -> Cow<'static, str> {
    client_key_from_headers(req.headers())
}
