//! Cross-origin middleware.
//!
//! Applies an [`OriginPolicy`] decision to the HTTP exchange:
//! - Allowed preflight: answered here with 200 and the permission headers
//! - Allowed request: passed through, origin reflected on the response
//! - Denied: passed through untouched; no `Access-Control-*` headers are
//!   attached, so the browser blocks the response
//!
//! Denial never short-circuits the request and never shows up in a body.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::observability::metrics;
use crate::security::origin::{OriginDecision, OriginPolicy};

/// Methods advertised on preflight responses.
pub const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Middleware function for origin access control.
pub async fn cors_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // An empty header is treated as absent and never reflected.
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .filter(|v| !v.is_empty())
        .cloned();
    let decision = match &origin {
        None => policy.evaluate(None),
        Some(value) => match value.to_str() {
            Ok(s) => policy.evaluate(Some(s)),
            Err(_) => OriginDecision::Malformed,
        },
    };

    log_decision(origin.as_ref(), decision);

    let allowed_origin = origin.filter(|_| decision.is_allowed());

    if is_preflight(&request) {
        if let Some(origin) = allowed_origin {
            return preflight_response(origin, request.headers());
        }
        return next.run(request).await;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Some(origin) = allowed_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
    response
}

fn is_preflight(request: &Request<Body>) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(header::ORIGIN)
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

fn preflight_response(origin: HeaderValue, request_headers: &HeaderMap) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    if let Some(requested) = request_headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        headers.append(
            header::VARY,
            HeaderValue::from_static("Access-Control-Request-Headers"),
        );
    }
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
    response
}

fn log_decision(origin: Option<&HeaderValue>, decision: OriginDecision) {
    metrics::record_origin_decision(decision);

    if decision == OriginDecision::NoOrigin {
        return;
    }
    let origin = origin
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();

    if decision.is_allowed() {
        tracing::debug!(origin = %origin, rule = decision.as_str(), "Origin allowed");
    } else {
        tracing::warn!(origin = %origin, reason = decision.as_str(), "Blocked origin");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::origin::AllowList;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(entries: &[&str], dev_mode: bool) -> Router {
        let policy = Arc::new(OriginPolicy::new(AllowList::new(entries).unwrap(), dev_mode));
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(policy, cors_middleware))
    }

    fn allow_origin(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_allowed_origin_is_reflected() {
        let response = app(&[".example.com"], false)
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("Origin", "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(allow_origin(&response), Some("https://app.example.com"));
    }

    #[tokio::test]
    async fn test_denied_origin_still_served_without_permission() {
        let response = app(&[".example.com"], false)
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("Origin", "https://example.com.evil.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(allow_origin(&response), None);
    }

    #[tokio::test]
    async fn test_allowed_preflight_short_circuits() {
        let response = app(&["https://app.example.com"], false)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/ping")
                    .header("Origin", "http://app.example.com")
                    .header("Access-Control-Request-Method", "POST")
                    .header("Access-Control-Request-Headers", "authorization,content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(allow_origin(&response), Some("http://app.example.com"));
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "authorization,content-type"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            ALLOWED_METHODS
        );
    }

    #[tokio::test]
    async fn test_denied_preflight_is_not_answered() {
        let response = app(&["https://app.example.com"], false)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/ping")
                    .header("Origin", "https://other.com")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(allow_origin(&response), None);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[tokio::test]
    async fn test_no_origin_passes_without_headers() {
        let response = app(&["https://app.example.com"], false)
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(allow_origin(&response), None);
    }

    #[tokio::test]
    async fn test_permissive_mode_reflects_any_origin() {
        let response = app(&[], false)
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("Origin", "https://whoever.dev")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(allow_origin(&response), Some("https://whoever.dev"));
    }

    #[tokio::test]
    async fn test_empty_origin_is_not_reflected() {
        let response = app(&[], false)
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("Origin", "")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
