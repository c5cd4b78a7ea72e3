//! File manager: content-addressed operations over a rooted filesystem view

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tokio::task;

use crate::error::{AppError, AppResult};
use crate::files::pattern::{MatcherFactory, PathMatcher, PatternFilter};
use crate::files::root::RootedFs;
use crate::files::{ContentSearch, LineDiffChunk};
use crate::models::File;

/// Options for [`FileManager::list_files`]
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub with_content: bool,
    pub show_hidden: bool,
    pub filter: PatternFilter,
}

impl ListOptions {
    pub fn with_content(mut self) -> Self {
        self.with_content = true;
        self
    }

    pub fn show_hidden(mut self) -> Self {
        self.show_hidden = true;
        self
    }

    pub fn with_filter(mut self, filter: PatternFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Stateless file operations; the only held state is the pattern matcher
/// factory.
pub struct FileManager {
    matcher_factory: Arc<dyn MatcherFactory>,
}

impl FileManager {
    pub fn new(matcher_factory: Arc<dyn MatcherFactory>) -> Self {
        Self { matcher_factory }
    }

    /// Create a new file. Parent directories are created as needed; an
    /// existing file is a conflict.
    pub async fn create_file(&self, fs: &RootedFs, path: &str, content: &str) -> AppResult<File> {
        tracing::debug!(path, "Creating file");

        let full_path = fs.resolve(path)?;

        if tokio::fs::try_exists(&full_path).await? {
            return Err(AppError::FileExists(path.to_string()));
        }

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, content).await?;

        self.read_file(fs, path).await
    }

    /// Read a file into numbered lines
    pub async fn read_file(&self, fs: &RootedFs, path: &str) -> AppResult<File> {
        let full_path = fs.resolve(path)?;
        read_to_file(&full_path, path).await
    }

    /// Overwrite an existing file; a missing file is an error
    pub async fn update_file(&self, fs: &RootedFs, path: &str, content: &str) -> AppResult<File> {
        tracing::debug!(path, "Updating file");

        let full_path = fs.resolve(path)?;

        if !tokio::fs::try_exists(&full_path).await? {
            return Err(AppError::FileNotFound(path.to_string()));
        }

        tokio::fs::write(&full_path, content).await?;

        self.read_file(fs, path).await
    }

    /// Remove a file; a missing file is an error
    pub async fn delete_file(&self, fs: &RootedFs, path: &str) -> AppResult<()> {
        tracing::debug!(path, "Deleting file");

        let full_path = fs.resolve(path)?;

        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Walk the project tree. Hidden entries are skipped unless requested;
    /// the filter applies include patterns first, then excludes.
    pub async fn list_files(&self, fs: &RootedFs, options: ListOptions) -> AppResult<Vec<File>> {
        let include = if options.filter.include.is_empty() {
            None
        } else {
            Some(self.matcher_factory.compile(&options.filter.include)?)
        };
        let exclude = if options.filter.exclude.is_empty() {
            None
        } else {
            Some(self.matcher_factory.compile(&options.filter.exclude)?)
        };

        let root = fs.root().to_path_buf();
        let with_content = options.with_content;
        let show_hidden = options.show_hidden;

        task::spawn_blocking(move || walk(&root, with_content, show_hidden, include, exclude))
            .await?
    }

    /// Apply a single-file unified diff and return the patched file
    pub async fn apply_patch(&self, fs: &RootedFs, path: &str, patch: &str) -> AppResult<File> {
        tracing::debug!(path, "Applying patch");

        let file = self.read_file(fs, path).await?;

        let file_count = patch
            .lines()
            .filter(|line| line.starts_with("--- "))
            .count();

        if file_count == 0 {
            return Err(AppError::InvalidPatch(format!(
                "no files changed in patch:\n{patch}"
            )));
        }

        if file_count > 1 {
            return Err(AppError::InvalidPatch(format!(
                "patch cannot contain multiple files:\n{patch}"
            )));
        }

        let parsed = diffy::Patch::from_str(patch)
            .map_err(|e| AppError::InvalidPatch(format!("{e}:\n{patch}")))?;

        let patched = diffy::apply(&file.get_content(), &parsed)
            .map_err(|e| AppError::InvalidPatch(format!("{e}:\n{patch}")))?;

        self.update_file(fs, path, &patched).await
    }

    /// Replace the half-open line range described by `chunk`
    pub async fn update_lines(
        &self,
        fs: &RootedFs,
        path: &str,
        chunk: &LineDiffChunk,
    ) -> AppResult<File> {
        tracing::debug!(path, chunk.start_line, chunk.end_line, "Updating lines");

        let file = self.read_file(fs, path).await?;
        let updated = file.replace_line_range(chunk.start_line, chunk.end_line, &chunk.content)?;

        self.update_file(fs, path, &updated.get_content()).await
    }

    /// Search file contents, returning files that carry only their matched
    /// lines with original numbering.
    pub async fn search_content(
        &self,
        fs: &RootedFs,
        search: &ContentSearch,
        filter: PatternFilter,
    ) -> AppResult<Vec<File>> {
        let options = ListOptions::default().with_content().with_filter(filter);
        let files = self.list_files(fs, options).await?;

        Ok(files
            .iter()
            .filter_map(|file| search.filter_file(file))
            .collect())
    }
}

async fn read_to_file(full_path: &Path, path: &str) -> AppResult<File> {
    match tokio::fs::read(full_path).await {
        Ok(bytes) => Ok(File::new(path, &String::from_utf8_lossy(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::FileNotFound(path.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn walk(
    root: &Path,
    with_content: bool,
    show_hidden: bool,
    include: Option<Arc<dyn PathMatcher>>,
    exclude: Option<Arc<dyn PathMatcher>>,
) -> AppResult<Vec<File>> {
    let mut files = Vec::new();

    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            show_hidden || entry.depth() == 0 || !is_hidden(entry.file_name())
        });

    for entry in walker {
        let entry =
            entry.map_err(|e| AppError::Internal(anyhow::anyhow!("directory walk failed: {e}")))?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("path outside walk root: {e}")))?;
        let relative = relative.to_string_lossy().replace('\\', "/");

        if let Some(include) = &include
            && !include.matches(&relative, false)
        {
            continue;
        }

        if let Some(exclude) = &exclude
            && exclude.matches(&relative, false)
        {
            continue;
        }

        if with_content {
            let bytes = std::fs::read(entry.path())?;
            files.push(File::new(&relative, &String::from_utf8_lossy(&bytes)));
        } else {
            files.push(File::empty(&relative));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
