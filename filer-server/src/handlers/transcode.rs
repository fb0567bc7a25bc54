use std::path::PathBuf;

use axum::{Json, extract::State, http::StatusCode};
use filer_core::SubmitError;
use filer_core::transcode::{TranscodeTask, choose_preset};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::infra::transcoding::TranscodeRequest;

#[derive(Debug, Default, Deserialize)]
pub struct ShowFormatRequest {
    #[serde(default)]
    pub sha1: String,
}

/// `POST /api/v1/showformat`: raw ffprobe JSON for the first file with
/// this hash.
pub async fn show_format_handler(
    State(state): State<AppState>,
    Json(request): Json<ShowFormatRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if request.sha1.is_empty() {
        return Err(AppError::bad_request("Wrong parameters"));
    }
    let record = state
        .catalog
        .first_by_hash(&request.sha1)
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let format = state.probe.show_format(&PathBuf::from(&record.path)).await?;
    Ok(Json(format))
}

/// `POST /api/v1/transcode`: queues an mp4 rendition of the first file with
/// this hash. The result is reported through the notifier, not here.
pub async fn transcode_handler(
    State(state): State<AppState>,
    Json(request): Json<TranscodeRequest>,
) -> AppResult<StatusCode> {
    if request.sha1.is_empty() || request.format != "mp4" {
        return Err(AppError::bad_request("Wrong parameters"));
    }
    let record = state
        .catalog
        .first_by_hash(&request.sha1)
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let transcoder = &state.config.transcoder;
    let Some(work_dir) = transcoder.work_dir.as_ref().filter(|_| state.transcoder.is_enabled())
    else {
        return Err(SubmitError::Disabled.into());
    };

    let source = PathBuf::from(&record.path);
    let preset = choose_preset(transcoder.preset_mode, &state.probe, &source).await?;
    let target = work_dir.join(format!("{}.mp4", Uuid::new_v4()));

    info!(
        source = %source.display(),
        target = %target.display(),
        %preset,
        "transcoding queued"
    );
    state.transcoder.submit(TranscodeTask {
        source,
        target,
        preset,
        context: request,
    })?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueLength {
    pub queued: usize,
    pub capacity: usize,
}

/// `GET /api/v1/transqlen`
pub async fn queue_length_handler(State(state): State<AppState>) -> Json<QueueLength> {
    Json(QueueLength {
        queued: state.transcoder.queue_depth(),
        capacity: state.transcoder.capacity(),
    })
}
