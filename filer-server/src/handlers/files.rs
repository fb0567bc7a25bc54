use std::path::Path as FsPath;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::AppState;
use crate::errors::{AppError, AppResult};

pub async fn hello_handler() -> &'static str {
    "Hello, World!\n"
}

/// `GET|HEAD /get/{sha1}/{name}`
///
/// Streams the first catalog record for `sha1` once `(sha1, name)` has been
/// registered through [`register_handler`] and the registration is still
/// fresh.
pub async fn download_handler(
    State(state): State<AppState>,
    Path((sha1, name)): Path<(String, String)>,
) -> AppResult<Response> {
    if !state.gate.authorize(&sha1, &name) {
        debug!(%sha1, %name, "download not authorized");
        return Err(AppError::not_found("File not found"));
    }
    let record = state
        .catalog
        .first_by_hash(&sha1)
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let file = File::open(&record.path).await.map_err(|err| {
        warn!(path = %record.path, error = %err, "catalog entry not readable");
        AppError::not_found("File not found")
    })?;
    let file_size = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(format!("Failed to read file metadata: {err}")))?
        .len();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(FsPath::new(&record.path))),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file_size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment"),
    );

    let stream = ReaderStream::new(file);
    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub url: String,
}

/// `POST /api/v1/get`: authorizes a download and hands back its URL.
/// Unknown hashes get `204 No Content`.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    if request.sha1.is_empty() || request.name.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    if state.catalog.first_by_hash(&request.sha1).is_none() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let token = state.gate.register(&request.sha1, &request.name);
    let url = format!("{}{}", state.config.server.base_url, token);
    Json(RegisterResponse { url }).into_response()
}

fn content_type(path: &FsPath) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wmv") => "video/x-ms-wmv",
        Some("flv") => "video/x-flv",
        Some("mkv") => "video/x-matroska",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type(FsPath::new("/m/a.MP4")), "video/mp4");
        assert_eq!(content_type(FsPath::new("/m/a.mp3")), "audio/mpeg");
        assert_eq!(
            content_type(FsPath::new("/m/readme")),
            "application/octet-stream"
        );
    }
}
