//! Project response DTOs

use serde::Serialize;

use crate::models::{DevContainerConfig, Project};

/// Project representation returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub path: String,
    pub container_id: String,
    pub config: DevContainerConfig,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            path: project.path.to_string_lossy().into_owned(),
            container_id: project.container_id,
            config: project.config,
        }
    }
}
