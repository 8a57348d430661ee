//! Client for the api-relay HTTP API.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upstream call to be performed by the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RelayDescriptor {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            method: Some(method.to_string()),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status, headers and decoded body of an API call.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// JSON when the body parses, otherwise the raw text as a string.
    pub body: Value,
}

pub struct RelayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            // Local test servers must not be routed through an environment proxy.
            client: Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach a bearer token to every subsequent call.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// POST /api/proxy
    pub async fn relay(&self, descriptor: &RelayDescriptor) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.request(reqwest::Method::POST, "/api/proxy").json(descriptor))
            .await
    }

    /// POST /api/proxy with a raw body, for malformed descriptors.
    pub async fn relay_raw(&self, body: &str) -> Result<ApiResponse, reqwest::Error> {
        let req = self
            .request(reqwest::Method::POST, "/api/proxy")
            .header("content-type", HeaderValue::from_static("application/json"))
            .body(body.to_string());
        self.send(req).await
    }

    /// GET /api/history
    pub async fn history(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.request(reqwest::Method::GET, "/api/history"))
            .await
    }

    /// POST /api/history
    pub async fn add_history(&self, entry: &Value) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.request(reqwest::Method::POST, "/api/history").json(entry))
            .await
    }

    /// DELETE /api/history
    pub async fn clear_history(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.request(reqwest::Method::DELETE, "/api/history"))
            .await
    }

    /// GET /api/collections
    pub async fn collections(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.request(reqwest::Method::GET, "/api/collections"))
            .await
    }

    /// POST /api/collections
    pub async fn create_collection(&self, name: &str) -> Result<ApiResponse, reqwest::Error> {
        let body = serde_json::json!({ "name": name });
        self.send(self.request(reqwest::Method::POST, "/api/collections").json(&body))
            .await
    }

    /// DELETE /api/collections/{id}
    pub async fn delete_collection(&self, id: &str) -> Result<ApiResponse, reqwest::Error> {
        let path = format!("/api/collections/{}", id);
        self.send(self.request(reqwest::Method::DELETE, &path)).await
    }

    /// POST /api/collections/{id}/items
    pub async fn add_item(&self, id: &str, item: &Value) -> Result<ApiResponse, reqwest::Error> {
        let path = format!("/api/collections/{}/items", id);
        self.send(self.request(reqwest::Method::POST, &path).json(item))
            .await
    }

    /// Arbitrary call, for paths without a dedicated method.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn send(&self, req: RequestBuilder) -> Result<ApiResponse, reqwest::Error> {
        decode(req.send().await?).await
    }
}

async fn decode(resp: Response) -> Result<ApiResponse, reqwest::Error> {
    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let text = resp.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    Ok(ApiResponse {
        status,
        headers,
        body,
    })
}
