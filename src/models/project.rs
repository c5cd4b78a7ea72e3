//! Project domain model

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::devcontainer::DevContainerConfig;

pub type ProjectId = String;

/// The unit of isolation: one directory + one container + zero-or-more
/// language server clients. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub path: PathBuf,
    pub container_id: String,
    pub config: DevContainerConfig,
}

impl Project {
    pub fn new(
        id: impl Into<ProjectId>,
        path: impl Into<PathBuf>,
        container_id: impl Into<String>,
        config: DevContainerConfig,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            container_id: container_id.into(),
            config,
        }
    }

    /// Look up a named task from the resolved devcontainer config
    pub fn find_task_by_alias(&self, alias: &str) -> AppResult<Task> {
        self.config
            .tasks()
            .iter()
            .find(|task| task.alias == alias)
            .cloned()
            .ok_or_else(|| AppError::TaskNotFound(alias.to_string()))
    }
}

/// A remote repository to open as a project
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Repository {
    #[validate(url)]
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// A named command declared in the devcontainer config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub alias: String,
    pub command: String,
}
