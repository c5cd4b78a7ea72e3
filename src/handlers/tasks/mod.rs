//! Task execution endpoints

pub mod handler;
pub mod request;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Task routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects/{id}/tasks", post(handler::create_task))
        .route("/projects/{id}/tasks", get(handler::list_tasks))
}
