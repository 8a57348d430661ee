//! Informational and debugging routes.

use axum::{
    body::Bytes,
    extract::Query,
    http::{HeaderMap, Method},
    Json,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::relay::executor::{collect_headers, decode_body};

pub async fn root() -> &'static str {
    "API is running..."
}

/// Endpoint discovery document.
pub async fn api_index() -> Json<Value> {
    Json(json!({
        "message": "API root",
        "endpoints": {
            "proxy": { "post": "/api/proxy" },
            "history": {
                "get": "/api/history",
                "post": "/api/history",
                "delete": "/api/history",
            },
            "collections": {
                "list": "/api/collections",
                "create": "/api/collections",
                "delete": "/api/collections/:id",
                "addItem": "/api/collections/:id/items",
            },
        },
    }))
}

/// Echo the request back, to debug client connectivity and CORS.
/// Only mounted in dev mode.
pub async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<Value> {
    let body = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        decode_body(&body)
    };

    Json(json!({
        "ok": true,
        "method": method.as_str(),
        "headers": collect_headers(&headers),
        "body": body,
        "query": query,
    }))
}
