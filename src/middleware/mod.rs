//! HTTP middleware for the edge gate.
//!
//! - **Gate**: origin allowlist, per-client rate limiting, response headers
//! - **Client IP**: client key derivation from forwarding headers
//! - **Origin**: exact-match `Origin` allowlist
//! - **Security Headers**: fixed header set and cache directives
//!
//! # Architecture
//!
//! ```text
//! Request → Origin check → Rate limit → Handler → Security headers → Response
//!               ↓              ↓
//!           403 Forbidden  429 Too Many Requests
//! ```

pub mod gate;
pub mod ip;
pub mod origin;
pub mod security_headers;

pub use gate::{EdgeGate, EdgeGateLayer, EdgeGateService};
pub use ip::{LOOPBACK_CLIENT_KEY, client_key_from_headers, extract_client_key};
pub use origin::{DEFAULT_ALLOWED_ORIGINS, OriginPolicy};
pub use security_headers::{
    DEFAULT_CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL, NO_STORE_CACHE_CONTROL,
    STATIC_ASSET_EXTENSIONS, is_static_asset,
};
