//! Fuzz testing for request header parsing.
//!
//! Feeds arbitrary header values and paths through the pieces of the gate
//! that read untrusted input, checking that none of them panic:
//!
//! - `client_key_from_headers`: `X-Forwarded-For` / `X-Real-IP` parsing
//! - `OriginPolicy::check`: `Origin` allowlist matching
//! - `is_static_asset`: path extension matching
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_headers -- -max_total_time=60
//! ```

#![no_main]

use arbitrary::Arbitrary;
use axum::http::{HeaderMap, HeaderValue};
use edge_gate::middleware::{OriginPolicy, client_key_from_headers, is_static_asset};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    forwarded_for: &'a [u8],
    real_ip: &'a [u8],
    origin: &'a [u8],
    path: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let mut headers = HeaderMap::new();
    // Bytes that are not valid header values never reach the gate.
    if let Ok(value) = HeaderValue::from_bytes(input.forwarded_for) {
        headers.insert("x-forwarded-for", value);
    }
    if let Ok(value) = HeaderValue::from_bytes(input.real_ip) {
        headers.insert("x-real-ip", value);
    }
    if let Ok(value) = HeaderValue::from_bytes(input.origin) {
        headers.insert("origin", value);
    }

    let key = client_key_from_headers(&headers);
    assert!(!key.is_empty());

    let _ = OriginPolicy::default().check(&headers);
    let _ = is_static_asset(input.path);
});
