use std::fmt::Write;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use filer_core::storage::StorageDevice;
use serde::Deserialize;
use tracing::warn;

use crate::AppState;
use crate::errors::{AppError, AppResult};

/// `GET /api/v1/catalog`: one `<sha1>,<json device ids>` line per hash.
pub async fn catalog_handler(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut groups = state.catalog.grouped_by_hash();
    groups.retain(|group| !group.is_empty());
    groups.sort_by(|a, b| a[0].content_hash.cmp(&b[0].content_hash));

    let mut body = String::new();
    for group in &groups {
        let first = &group[0];
        let mut devices = Vec::with_capacity(group.len());
        for record in group {
            match record.device_id() {
                Some(id) => devices.push(id),
                None => warn!(path = %record.path, "record without device"),
            }
        }
        let devices = serde_json::to_string(&devices)
            .map_err(|err| AppError::internal(format!("Failed to encode devices: {err}")))?;
        let _ = writeln!(body, "{},{}", first.content_hash, devices);
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        body,
    ))
}

/// `GET /api/v1/storages`
pub async fn storages_handler(State(state): State<AppState>) -> Json<Vec<StorageDevice>> {
    Json(state.catalog.devices())
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub path: String,
}

/// `POST /api/v1/update`: queues a changed file for the reconcile loop.
pub async fn update_handler(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> AppResult<StatusCode> {
    if request.path.is_empty() {
        return Err(AppError::bad_request("path is required"));
    }
    state
        .updates
        .send(request.path)
        .await
        .map_err(|_| AppError::unavailable("update loop is not running"))?;
    Ok(StatusCode::OK)
}
