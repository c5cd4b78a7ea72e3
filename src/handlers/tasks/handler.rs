//! Task handler implementations

use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::AppResult;
use crate::models::Task;
use crate::project::TaskResult;
use crate::state::AppState;

use super::request::CreateTaskRequest;

/// Execute a command (or a task alias) inside the project container
pub async fn create_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateTaskRequest>,
) -> AppResult<Json<TaskResult>> {
    payload.validate()?;

    let command = match (payload.command, payload.alias) {
        (Some(command), _) => command,
        (None, Some(alias)) => {
            let task = state.manager().resolve_task_alias(&id, &alias).await?;
            task.command
        }
        (None, None) => unreachable!("validated above"),
    };

    let result = state.manager().create_task(&id, &command).await?;

    Ok(Json(result))
}

/// List the tasks declared in the project's devcontainer config
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Task>>> {
    let project = state.manager().get_project(&id).await?;

    Ok(Json(project.config.tasks().to_vec()))
}
