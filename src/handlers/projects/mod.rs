//! Project lifecycle endpoints

pub mod handler;
pub mod response;

use axum::{
    Router,
    routing::{delete, post},
};

use crate::state::AppState;

/// Project routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(handler::create_project))
        .route("/projects/{id}", delete(handler::delete_project))
}
