//! File operations over a project workspace
//!
//! Every operation is bounded to a project root through [`RootedFs`]; paths
//! that escape the root (via `..`, absolute components, or symlinks) are
//! rejected before any I/O happens.

pub mod manager;
pub mod pattern;
pub mod root;
pub mod search;

pub use manager::{FileManager, ListOptions};
pub use pattern::{GitignoreMatcherFactory, MatcherFactory, PatternFilter, parse_gitignore};
pub use root::RootedFs;
pub use search::ContentSearch;

use serde::Deserialize;

/// A half-open line-range replacement: `[start_line, end_line)` is replaced
/// by `content`. Bounds are 1-based; `start_line == end_line` inserts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDiffChunk {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}
