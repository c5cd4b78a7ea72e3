//! Gitignore-style pattern filtering
//!
//! Include/exclude patterns are compiled through a pluggable factory so the
//! matcher implementation can be swapped in tests. The default factory uses
//! the `ignore` crate's gitignore semantics, which also makes `.gitignore`
//! lines usable verbatim as exclude patterns.

use std::sync::Arc;

use ignore::gitignore::GitignoreBuilder;

use crate::error::{AppError, AppResult};

/// Include-then-exclude pattern filter applied to project-relative paths
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl PatternFilter {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Extend this filter's exclude list with additional patterns
    pub fn with_excludes(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(patterns);
        self
    }
}

/// A compiled pattern set
pub trait PathMatcher: Send + Sync {
    fn matches(&self, path: &str, is_dir: bool) -> bool;
}

/// Compiles pattern lists into matchers
pub trait MatcherFactory: Send + Sync {
    fn compile(&self, patterns: &[String]) -> AppResult<Arc<dyn PathMatcher>>;
}

/// Default factory backed by gitignore semantics
#[derive(Debug, Clone, Default)]
pub struct GitignoreMatcherFactory;

impl MatcherFactory for GitignoreMatcherFactory {
    fn compile(&self, patterns: &[String]) -> AppResult<Arc<dyn PathMatcher>> {
        let mut builder = GitignoreBuilder::new("");

        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| AppError::Validation(format!("invalid pattern {pattern}: {e}")))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| AppError::Validation(format!("invalid patterns: {e}")))?;

        Ok(Arc::new(GitignoreMatcher { matcher }))
    }
}

struct GitignoreMatcher {
    matcher: ignore::gitignore::Gitignore,
}

impl PathMatcher for GitignoreMatcher {
    fn matches(&self, path: &str, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

/// Parse `.gitignore` content into patterns: lines are trimmed, blanks and
/// `#` comments skipped.
pub fn parse_gitignore(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gitignore_skips_blanks_and_comments() {
        let patterns = parse_gitignore("# build output\n\ntarget/\n  *.log  \n");
        assert_eq!(patterns, vec!["target/".to_string(), "*.log".to_string()]);
    }

    #[test]
    fn test_gitignore_matcher_globs() {
        let factory = GitignoreMatcherFactory;
        let matcher = factory
            .compile(&["*.log".to_string(), "node_modules".to_string()])
            .unwrap();

        assert!(matcher.matches("debug.log", false));
        assert!(matcher.matches("deep/nested/trace.log", false));
        assert!(matcher.matches("node_modules/react/index.js", false));
        assert!(!matcher.matches("src/main.rs", false));
    }

    #[test]
    fn test_directory_pattern() {
        let factory = GitignoreMatcherFactory;
        let matcher = factory.compile(&["target/".to_string()]).unwrap();

        assert!(matcher.matches("target", true));
        assert!(matcher.matches("target/debug/hide", false));
        assert!(!matcher.matches("targeted.txt", false));
    }
}
