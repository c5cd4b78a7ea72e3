//! File and line models
//!
//! Files are represented as ordered sequences of numbered lines. Line numbers
//! are 1-based and contiguous. Diagnostics attached by the language server
//! ride along with the file when present.

use lsp_types::Diagnostic;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A single line of a file, without its trailing newline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub number: usize,
    pub content: String,
}

/// A file inside a project, addressed by its project-root-relative path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    pub lines: Vec<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<Diagnostic>>,
}

impl File {
    /// Create a file from raw content, splitting it into numbered lines.
    /// A trailing newline does not produce an empty final line.
    pub fn new(path: impl Into<String>, content: &str) -> Self {
        Self {
            path: path.into(),
            lines: new_lines(content),
            diagnostics: None,
        }
    }

    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
            diagnostics: None,
        }
    }

    /// Reassemble the content. Every line gets a trailing newline, so content
    /// round-trips modulo final-newline normalization.
    pub fn get_content(&self) -> String {
        let mut content = String::new();

        for line in &self.lines {
            content.push_str(&line.content);
            content.push('\n');
        }

        content
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line lookup by 1-based number
    pub fn get_line(&self, number: usize) -> Option<&Line> {
        if number < 1 {
            return None;
        }

        self.lines.get(number - 1)
    }

    /// A copy holding only the lines in `[start, end)`, keeping their
    /// original numbers. Out-of-range bounds are clamped.
    pub fn with_line_range(&self, start: usize, end: usize) -> Self {
        let start = start.max(1) - 1;
        let end = end.saturating_sub(1).min(self.lines.len());

        Self {
            path: self.path.clone(),
            lines: self.lines[start.min(end)..end].to_vec(),
            diagnostics: None,
        }
    }

    /// A copy holding only the given lines (used by content search)
    pub fn with_lines(&self, lines: Vec<Line>) -> Self {
        Self {
            path: self.path.clone(),
            lines,
            diagnostics: None,
        }
    }

    /// Replace the half-open line range `[start, end)` with `content`.
    /// `start == end` inserts before `start`. Lines are renumbered so that
    /// numbering stays contiguous and 1-based.
    pub fn replace_line_range(&self, start: usize, end: usize, content: &str) -> AppResult<Self> {
        if start < 1 {
            return Err(AppError::Validation(
                "start line must be greater than or equal to 1".to_string(),
            ));
        }

        if end < start {
            return Err(AppError::Validation(
                "end line must be greater than or equal to start line".to_string(),
            ));
        }

        if start > self.lines.len() + 1 {
            return Err(AppError::Validation(format!(
                "start line must be less than or equal to {}",
                self.lines.len() + 1
            )));
        }

        if end > self.lines.len() + 1 {
            return Err(AppError::Validation(format!(
                "end line must be less than or equal to {}",
                self.lines.len() + 1
            )));
        }

        let replacement = new_lines(content);

        let mut lines = Vec::with_capacity(self.lines.len() - (end - start) + replacement.len());
        lines.extend_from_slice(&self.lines[..start - 1]);
        lines.extend(replacement);
        lines.extend_from_slice(&self.lines[end - 1..]);

        for (i, line) in lines.iter_mut().enumerate() {
            line.number = i + 1;
        }

        Ok(Self {
            path: self.path.clone(),
            lines,
            diagnostics: None,
        })
    }
}

/// Split content into numbered lines. The final newline is normalized away.
pub fn new_lines(content: &str) -> Vec<Line> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| Line {
            number: i + 1,
            content: line.to_string(),
        })
        .collect()
}
