//! In-memory project store
//!
//! Thread-safe map from project id to project. Writes are exclusive; reads
//! return clones so no lock is held during downstream I/O. State is
//! process-local and does not survive restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::{Project, ProjectId};

#[derive(Default)]
pub struct ProjectStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new project; duplicates are rejected
    pub fn create_project(&self, project: Project) -> AppResult<()> {
        let mut projects = self.projects.write().unwrap();

        if projects.contains_key(&project.id) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "project {} already exists",
                project.id
            )));
        }

        projects.insert(project.id.clone(), project);

        Ok(())
    }

    pub fn get_project(&self, project_id: &str) -> AppResult<Project> {
        self.projects
            .read()
            .unwrap()
            .get(project_id)
            .cloned()
            .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))
    }

    pub fn get_projects(&self) -> Vec<Project> {
        self.projects.read().unwrap().values().cloned().collect()
    }

    pub fn update_project(&self, project: Project) -> AppResult<()> {
        let mut projects = self.projects.write().unwrap();

        if !projects.contains_key(&project.id) {
            return Err(AppError::ProjectNotFound(project.id.clone()));
        }

        projects.insert(project.id.clone(), project);

        Ok(())
    }

    pub fn delete_project(&self, project_id: &str) -> AppResult<()> {
        self.projects
            .write()
            .unwrap()
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))
    }
}
