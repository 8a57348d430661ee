//! Request limits.
//!
//! # Responsibilities
//! - Enforce maximum inbound request body size
//!
//! # Design Decisions
//! - Limit enforced on the body stream, before extractors buffer it
//! - Oversized bodies are answered with 413 Payload Too Large

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Wrap a router with a body size cap.
pub fn apply(router: Router, max_body_size: usize) -> Router {
    router
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
