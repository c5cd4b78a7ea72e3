//! Per-line content search
//!
//! Three modes: case-insensitive substring (default), case-sensitive
//! substring (`exact`), and regex. Matching files are returned with only
//! their matched lines, keeping the original 1-based numbers.

use regex::Regex;

use crate::error::{AppError, AppResult};
use crate::models::{File, Line};

/// A compiled content query
#[derive(Debug, Clone)]
pub enum ContentSearch {
    Literal { query: String, exact: bool },
    Regex(Regex),
}

impl ContentSearch {
    pub fn literal(query: impl Into<String>, exact: bool) -> Self {
        Self::Literal {
            query: query.into(),
            exact,
        }
    }

    /// Compile a regex query; an invalid pattern is a client error
    pub fn regex(query: &str) -> AppResult<Self> {
        let regex =
            Regex::new(query).map_err(|e| AppError::Validation(format!("invalid regex: {e}")))?;
        Ok(Self::Regex(regex))
    }

    fn matches(&self, line: &str) -> bool {
        match self {
            Self::Literal { query, exact: true } => line.contains(query.as_str()),
            Self::Literal { query, exact: false } => {
                line.to_lowercase().contains(&query.to_lowercase())
            }
            Self::Regex(regex) => regex.is_match(line),
        }
    }

    /// Keep only matched lines; `None` when nothing matches
    pub fn filter_file(&self, file: &File) -> Option<File> {
        let matched: Vec<Line> = file
            .lines
            .iter()
            .filter(|line| self.matches(&line.content))
            .cloned()
            .collect();

        if matched.is_empty() {
            return None;
        }

        Some(file.with_lines(matched))
    }
}
