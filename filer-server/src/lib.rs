//! HTTP front end and background loops of the filer media server.

pub mod errors;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::{AppParts, AppState};

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::files;

/// Full router: public download routes plus the versioned API.
pub fn create_app(state: AppState) -> Router {
    let versioned_api = routes::create_api_router(state.clone());

    Router::new()
        .route("/", get(files::hello_handler))
        // axum answers HEAD from GET routes
        .route("/get/{sha1}/{name}", get(files::download_handler))
        .merge(versioned_api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
