//! Fixed security header set and cache directives.
//!
//! # Headers
//!
//! | Header | Value |
//! |---|---|
//! | `X-DNS-Prefetch-Control` | `on` |
//! | `Strict-Transport-Security` | `max-age=63072000; includeSubDomains; preload` |
//! | `X-Frame-Options` | `SAMEORIGIN` |
//! | `X-Content-Type-Options` | `nosniff` |
//! | `Referrer-Policy` | `origin-when-cross-origin` |
//! | `X-Permitted-Cross-Domain-Policies` | `none` |
//! | `X-XSS-Protection` | `1; mode=block` |
//!
//! # Cache-Control
//!
//! - static assets (by extension): `public, max-age=31536000, immutable`
//! - everything else: `public, max-age=86400, stale-while-revalidate=3600`,
//!   unless the handler already chose a value
//! - gate rejections: `no-store`

use axum::http::HeaderMap;
use axum::http::header::{
    CACHE_CONTROL, HeaderName, HeaderValue, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
    X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};

/// Default `Cache-Control` for pages and other dynamic paths.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=86400, stale-while-revalidate=3600";

/// `Cache-Control` for fingerprinted static assets.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// `Cache-Control` for responses that must never be cached.
pub const NO_STORE_CACHE_CONTROL: &str = "no-store";

/// Extensions that identify a static asset.
pub const STATIC_ASSET_EXTENSIONS: [&str; 11] = [
    "js", "css", "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "woff", "woff2",
];

static SECURITY_HEADERS: [(HeaderName, HeaderValue); 7] = [
    (X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("on")),
    (
        STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
    ),
    (X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
    (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
    (
        REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    ),
    (
        HeaderName::from_static("x-permitted-cross-domain-policies"),
        HeaderValue::from_static("none"),
    ),
    (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
];

/// Whether `path` names a static asset, judged by its final extension.
///
/// Only the last path segment is inspected, so `/assets.js/page` is not an
/// asset. Extension matching ignores ASCII case.
pub fn is_static_asset(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            STATIC_ASSET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Overwrite the fixed security headers.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in &SECURITY_HEADERS {
        headers.insert(name.clone(), value.clone());
    }
}

/// Set `Cache-Control` for an admitted response.
///
/// Static assets always get the immutable directive. Other responses get
/// the default only if the handler left `Cache-Control` unset.
pub fn apply_cache_control(headers: &mut HeaderMap, static_asset: bool) {
    if static_asset {
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
        );
    } else if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(DEFAULT_CACHE_CONTROL));
    }
}

/// Headers for a response that passed the gate.
pub fn apply_response_headers(headers: &mut HeaderMap, static_asset: bool) {
    apply_security_headers(headers);
    apply_cache_control(headers, static_asset);
}

/// Headers for a gate rejection: the security set plus `no-store`.
pub fn apply_rejection_headers(headers: &mut HeaderMap) {
    apply_security_headers(headers);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE_CACHE_CONTROL));
}
