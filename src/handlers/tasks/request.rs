//! Task request DTOs

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Run a task: either a raw command or a config-declared alias, never both
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub command: Option<String>,
    pub alias: Option<String>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> AppResult<()> {
        match (&self.command, &self.alias) {
            (Some(_), Some(_)) => Err(AppError::Validation(
                "command and alias are mutually exclusive".to_string(),
            )),
            (None, None) => Err(AppError::Validation(
                "either command or alias must be provided".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
