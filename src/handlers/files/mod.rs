//! File operation endpoints

pub mod handler;
pub mod request;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// File routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects/{id}/files", post(handler::create_file))
        .route("/projects/{id}/files", get(handler::list_files))
        .route("/projects/{id}/files/{*path}", get(handler::read_file))
        .route("/projects/{id}/files/{*path}", put(handler::update_file))
        .route("/projects/{id}/files/{*path}", delete(handler::delete_file))
}
