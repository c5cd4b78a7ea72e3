//! File request DTOs

use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Create a file with the given content
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFileRequest {
    #[validate(length(min = 1))]
    pub path: String,
    pub content: String,
}

/// Update variant tags
pub const UDIFF: &str = "udiff";
pub const LINEDIFF: &str = "linediff";
pub const OVERWRITE: &str = "overwrite";

#[derive(Debug, Deserialize)]
pub struct UdiffRequest {
    pub patch: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDiffRequest {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct OverwriteRequest {
    pub content: String,
}

/// Tagged file update: exactly one variant payload must be present and it
/// must match `type`.
#[derive(Debug, Deserialize)]
pub struct UpdateFileRequest {
    #[serde(rename = "type", default)]
    pub update_type: String,
    pub udiff: Option<UdiffRequest>,
    pub linediff: Option<LineDiffRequest>,
    pub overwrite: Option<OverwriteRequest>,
}

impl UpdateFileRequest {
    pub fn validate(&self) -> AppResult<()> {
        let (expected, present) = match self.update_type.as_str() {
            UDIFF => (UDIFF, self.udiff.is_some()),
            LINEDIFF => (LINEDIFF, self.linediff.is_some()),
            OVERWRITE => (OVERWRITE, self.overwrite.is_some()),
            "" => {
                return Err(AppError::Validation("type must be provided".to_string()));
            }
            other => {
                return Err(AppError::Validation(format!("invalid type: {other}")));
            }
        };

        if !present {
            return Err(AppError::Validation(format!("{expected} must be provided")));
        }

        let count = [
            self.udiff.is_some(),
            self.linediff.is_some(),
            self.overwrite.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        if count > 1 {
            return Err(AppError::Validation(
                "exactly one of udiff, linediff, or overwrite must be provided".to_string(),
            ));
        }

        Ok(())
    }
}

/// Query options for listing files
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    pub show_hidden: Option<String>,
    /// Comma-separated include patterns
    pub include: Option<String>,
    /// Comma-separated exclude patterns
    pub exclude: Option<String>,
}

/// Query options for reading a file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileQuery {
    pub show_line_numbers: Option<String>,
    pub start_line: Option<usize>,
    pub num_lines: Option<usize>,
}

/// Split a comma-separated pattern list query value
pub fn split_patterns(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect()
}
