use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{catalog, files, transcode},
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/catalog", get(catalog::catalog_handler))
        .route("/storages", get(catalog::storages_handler))
        .route("/update", post(catalog::update_handler))
        // Delivery
        .route("/get", post(files::register_handler))
        // Transcoding
        .route("/showformat", post(transcode::show_format_handler))
        .route("/transcode", post(transcode::transcode_handler))
        .route("/transqlen", get(transcode::queue_length_handler))
        .with_state(state)
}
