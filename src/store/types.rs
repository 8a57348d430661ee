//! Stored records and their request bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A toggleable key/value pair (query param or header) as edited in the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

/// The response captured alongside a history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Milliseconds, as measured by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
}

/// Body of `POST /api/history`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryInput {
    pub url: Option<String>,
    pub method: Option<String>,
    pub params: Vec<KeyValue>,
    pub headers: Vec<KeyValue>,
    pub body: Option<String>,
    pub response: Option<RecordedResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<KeyValue>,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RecordedResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Build an entry for `user`; `None` when url or method is missing.
    pub fn from_input(user: &str, input: HistoryInput) -> Option<Self> {
        let url = input.url.filter(|u| !u.trim().is_empty())?;
        let method = input.method.filter(|m| !m.trim().is_empty())?;
        let now = Utc::now();
        Some(Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            url,
            method,
            params: input.params,
            headers: input.headers,
            body: input.body,
            response: input.response,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of `POST /api/collections/{id}/items`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectionItemInput {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub params: Vec<KeyValue>,
    pub headers: Vec<KeyValue>,
    pub body: Option<String>,
}

/// A saved request inside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Vec<KeyValue>,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl From<CollectionItemInput> for CollectionItem {
    fn from(input: CollectionItemInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            url: input.url,
            method: input.method,
            params: input.params,
            headers: input.headers,
            body: input.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<CollectionItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
