//! History and collection handlers. All routes here sit behind `require_auth`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::CallerContext;
use crate::store::{
    Collection, CollectionItemInput, HistoryEntry, HistoryInput, HISTORY_PAGE,
};

pub async fn get_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Json<Vec<HistoryEntry>> {
    Json(state.store.recent_history(&caller.user_id, HISTORY_PAGE))
}

pub async fn add_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(input): Json<HistoryInput>,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    let entry = HistoryEntry::from_input(&caller.user_id, input)
        .ok_or(ApiError::BadRequest("URL and Method are required"))?;
    Ok((StatusCode::CREATED, Json(state.store.add_history(entry))))
}

pub async fn clear_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Json<Value> {
    let removed = state.store.clear_history(&caller.user_id);
    tracing::debug!(user = %caller.user_id, removed, "History cleared");
    Json(json!({ "message": "History cleared" }))
}

pub async fn get_collections(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Json<Vec<Collection>> {
    Json(state.store.list_collections(&caller.user_id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewCollection {
    pub name: Option<String>,
}

pub async fn create_collection(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(input): Json<NewCollection>,
) -> Result<(StatusCode, Json<Collection>), ApiError> {
    let name = input
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or(ApiError::BadRequest("Collection name is required"))?;
    let collection = state.store.create_collection(&caller.user_id, name);
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_collection(&caller.user_id, id)?;
    Ok(Json(json!({ "message": "Collection removed" })))
}

pub async fn add_collection_item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<Uuid>,
    Json(item): Json<CollectionItemInput>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state.store.add_collection_item(&caller.user_id, id, item)?;
    Ok(Json(collection))
}
