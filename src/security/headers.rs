//! Security response headers.
//!
//! # Responsibilities
//! - Add hardening headers to every response (optional)
//!
//! # Design Decisions
//! - Headers are only set when a handler has not set them already
//! - No `Cross-Origin-Resource-Policy`; it would interfere with the
//!   cross-origin permission granted by `cors.rs`

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Headers added to every response when enabled.
pub const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=15552000; includeSubDomains",
    ),
];

/// Wrap a router with the security header layers.
pub fn apply(router: Router, enabled: bool) -> Router {
    if !enabled {
        return router;
    }
    SECURITY_HEADERS
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                name,
                HeaderValue::from_static(value),
            ))
        })
}
