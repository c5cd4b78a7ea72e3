//! Project handler implementations

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::project::CreateProjectRequest;
use crate::state::AppState;

use super::response::ProjectResponse;

/// Create a project from a repository: clone, provision the devcontainer,
/// start language servers. Responds once the project is fully created.
pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ProjectResponse>)> {
    payload.validate()?;

    let handle = state.manager().create_project(payload);
    let project = handle
        .await
        .map_err(|_| AppError::Internal(anyhow::anyhow!("project creation aborted")))??;

    Ok((StatusCode::CREATED, Json(project.into())))
}

/// Delete a project: stop the container, drop language servers, remove the
/// working tree.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let handle = state.manager().delete_project(&id);
    handle
        .await
        .map_err(|_| AppError::Internal(anyhow::anyhow!("project deletion aborted")))??;

    Ok(StatusCode::NO_CONTENT)
}
