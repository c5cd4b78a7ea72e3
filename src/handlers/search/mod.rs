//! Content and symbol search endpoints

pub mod handler;
pub mod request;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Search routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects/{id}/search", get(handler::search_files))
        .route("/projects/{id}/symbols", get(handler::search_symbols))
}
