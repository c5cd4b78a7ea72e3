//! Project manager: orchestrates git, devcontainer, file, and LSP services
//!
//! Creation and deletion run in the background and publish exactly one result
//! on a one-shot channel. Dropping the creation handle cancels the in-flight
//! work and triggers rollback; any failed creation step rolls back to nothing
//! (container stopped, directory removed, no store entry).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lsp_types::Diagnostic;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use validator::Validate;

use crate::constants::{MAX_DIAGNOSTICS_DELAY, PROJECT_ID_LENGTH, TASK_SHELL};
use crate::devcontainer::image_manager::random_string;
use crate::devcontainer::{ExecResult, Runner};
use crate::error::{AppError, AppResult};
use crate::files::{
    ContentSearch, FileManager, LineDiffChunk, ListOptions, PatternFilter, RootedFs,
    parse_gitignore,
};
use crate::git::GitService;
use crate::lsp::{LanguageDetector, LspService, SymbolFilter, SymbolInfo};
use crate::models::{DevContainerConfig, File, Project, Repository, Task};
use crate::project::store::ProjectStore;

/// Request to open a repository as a project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(nested)]
    pub repository: Repository,
    pub devcontainer: Option<DevContainerConfig>,
}

/// Outcome of an in-container task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl From<ExecResult> for TaskResult {
    fn from(result: ExecResult) -> Self {
        Self {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
        }
    }
}

/// The orchestration surface exposed to HTTP handlers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectManager: Send + Sync {
    /// Start project creation in the background; the receiver resolves once
    /// with the created project or the failure. Dropping it cancels the work.
    fn create_project(&self, request: CreateProjectRequest)
    -> oneshot::Receiver<AppResult<Project>>;

    /// Start project deletion in the background; resolves once
    fn delete_project(&self, project_id: &str) -> oneshot::Receiver<AppResult<()>>;

    async fn get_project(&self, project_id: &str) -> AppResult<Project>;

    async fn get_projects(&self) -> AppResult<Vec<Project>>;

    async fn create_file(&self, project_id: &str, path: &str, content: &str) -> AppResult<File>;

    async fn read_file(&self, project_id: &str, path: &str) -> AppResult<File>;

    async fn update_file(&self, project_id: &str, path: &str, content: &str) -> AppResult<File>;

    async fn delete_file(&self, project_id: &str, path: &str) -> AppResult<()>;

    async fn list_files(
        &self,
        project_id: &str,
        show_hidden: bool,
        filter: PatternFilter,
    ) -> AppResult<Vec<File>>;

    async fn apply_patch(&self, project_id: &str, path: &str, patch: &str) -> AppResult<File>;

    async fn update_lines(
        &self,
        project_id: &str,
        path: &str,
        chunk: LineDiffChunk,
    ) -> AppResult<File>;

    async fn search_content(
        &self,
        project_id: &str,
        search: ContentSearch,
        filter: PatternFilter,
    ) -> AppResult<Vec<File>>;

    async fn create_task(&self, project_id: &str, command: &str) -> AppResult<TaskResult>;

    async fn resolve_task_alias(&self, project_id: &str, alias: &str) -> AppResult<Task>;

    async fn search_symbols(
        &self,
        project_id: &str,
        query: &str,
        filter: SymbolFilter,
    ) -> AppResult<Vec<SymbolInfo>>;

    /// Delete every stored project concurrently, bounded by `deadline`
    async fn cleanup(&self, deadline: Duration) -> AppResult<()>;
}

/// Production manager wiring all services together
#[derive(Clone)]
pub struct ProjectManagerImpl {
    runner: Arc<dyn Runner>,
    git: Arc<dyn GitService>,
    store: Arc<ProjectStore>,
    projects_root: PathBuf,
    file_manager: Arc<FileManager>,
    lsp: Arc<dyn LspService>,
    detector: LanguageDetector,
}

impl ProjectManagerImpl {
    pub fn new(
        runner: Arc<dyn Runner>,
        git: Arc<dyn GitService>,
        store: Arc<ProjectStore>,
        projects_root: impl Into<PathBuf>,
        file_manager: Arc<FileManager>,
        lsp: Arc<dyn LspService>,
        detector: LanguageDetector,
    ) -> Self {
        Self {
            runner,
            git,
            store,
            projects_root: projects_root.into(),
            file_manager,
            lsp,
            detector,
        }
    }

    fn rooted(&self, project: &Project) -> RootedFs {
        RootedFs::new(&project.path)
    }

    async fn do_create(
        &self,
        request: CreateProjectRequest,
        project_id: String,
        project_path: PathBuf,
    ) -> AppResult<Project> {
        tracing::debug!(url = %request.repository.url, %project_id, "Creating project");

        tokio::fs::create_dir_all(&project_path).await?;

        if let Err(e) = self
            .git
            .clone_repository(&request.repository, &project_path)
            .await
        {
            tracing::error!(error = %e, "Failed to clone git repo");
            remove_project_dir(&project_path).await;
            return Err(e);
        }

        let config = match request.devcontainer {
            Some(config) => config,
            None => match crate::devcontainer::config_from_project(&project_path).await {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to resolve devcontainer config");
                    remove_project_dir(&project_path).await;
                    return Err(e);
                }
            },
        };

        if let Err(e) = validate_task_aliases(&config) {
            remove_project_dir(&project_path).await;
            return Err(e);
        }

        let container_id = match self.runner.run(&project_path, &config).await {
            Ok(container_id) => container_id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to launch devcontainer");
                remove_project_dir(&project_path).await;
                return Err(e);
            }
        };

        let project = Project::new(project_id.clone(), project_path.clone(), container_id, config);

        let files = match self.enumerate_with_content(&project).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list project files");
                self.rollback(&project).await;
                return Err(e);
            }
        };

        if let Some(language) = self.detector.detect_main_language(&files) {
            tracing::debug!(%project_id, %language, "Detected main language");

            if let Err(e) = self.lsp.start_server(&project, &language).await {
                tracing::warn!(error = %e, "Failed to start LSP server. Diagnostics will not be available.");
            }
        }

        if let Err(e) = self.store.create_project(project.clone()) {
            tracing::error!(error = %e, "Failed to save project");
            self.rollback(&project).await;
            return Err(e);
        }

        tracing::debug!(%project_id, "Created project");

        Ok(project)
    }

    /// Gitignore-filtered listing with content, used for language detection
    async fn enumerate_with_content(&self, project: &Project) -> AppResult<Vec<File>> {
        let fs = self.rooted(project);
        let excludes = self.gitignore_excludes(&fs).await?;
        let options = ListOptions::default()
            .with_content()
            .with_filter(PatternFilter::default().with_excludes(excludes));

        self.file_manager.list_files(&fs, options).await
    }

    async fn gitignore_excludes(&self, fs: &RootedFs) -> AppResult<Vec<String>> {
        match self.file_manager.read_file(fs, ".gitignore").await {
            Ok(file) => Ok(parse_gitignore(&file.get_content())),
            Err(AppError::FileNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn rollback(&self, project: &Project) {
        if let Err(e) = self.runner.stop(&project.container_id).await {
            tracing::error!(container_id = %project.container_id, error = %e, "Failed to stop container during rollback");
        }

        remove_project_dir(&project.path).await;
    }

    /// Stop container, clean up LSP, drop from store, remove directory
    async fn do_delete(&self, project: &Project) -> AppResult<()> {
        tracing::debug!(project_id = %project.id, "Deleting project");

        self.runner.stop(&project.container_id).await?;
        self.lsp.cleanup_project(&project.id).await?;
        self.store.delete_project(&project.id)?;
        remove_project_dir(&project.path).await;

        tracing::debug!(project_id = %project.id, "Deleted project");

        Ok(())
    }

    /// didOpen → bounded wait → collect → didClose. `LanguageServerNotFound`
    /// is swallowed; the file simply carries no diagnostics.
    async fn collect_diagnostics(
        &self,
        project: &Project,
        file: &File,
    ) -> AppResult<Option<Vec<Diagnostic>>> {
        match self.lsp.notify_did_open(project, file).await {
            Ok(()) => {}
            Err(AppError::LanguageServerNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        }

        let diagnostics = match self
            .lsp
            .diagnostics(project, file, MAX_DIAGNOSTICS_DELAY)
            .await
        {
            Ok(diagnostics) => diagnostics,
            Err(AppError::LanguageServerNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        match self.lsp.notify_did_close(project, file).await {
            Ok(()) | Err(AppError::LanguageServerNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(Some(diagnostics))
    }

    async fn with_diagnostics(&self, project: &Project, mut file: File) -> File {
        match self.collect_diagnostics(project, &file).await {
            Ok(diagnostics) => file.diagnostics = diagnostics,
            Err(e) => {
                tracing::warn!(project_id = %project.id, path = %file.path, error = %e, "Failed to get diagnostics");
                file.diagnostics = Some(Vec::new());
            }
        }

        file
    }
}

#[async_trait]
impl ProjectManager for ProjectManagerImpl {
    fn create_project(
        &self,
        request: CreateProjectRequest,
    ) -> oneshot::Receiver<AppResult<Project>> {
        let (tx, rx) = oneshot::channel();

        let manager = self.clone();
        let project_id = random_string(PROJECT_ID_LENGTH);
        let project_path = self.projects_root.join(&project_id);

        tokio::spawn(async move {
            let mut tx = tx;

            let work = manager.do_create(request, project_id.clone(), project_path.clone());
            tokio::pin!(work);

            let result = tokio::select! {
                _ = tx.closed() => None,
                result = &mut work => Some(result),
            };

            match result {
                Some(result) => {
                    let _ = tx.send(result);
                }
                None => {
                    // Caller dropped the handle: the pipeline future is gone,
                    // reclaim whatever already reached disk.
                    tracing::debug!(%project_id, "Project creation cancelled by caller");
                    remove_project_dir(&project_path).await;
                }
            }
        });

        rx
    }

    fn delete_project(&self, project_id: &str) -> oneshot::Receiver<AppResult<()>> {
        let (tx, rx) = oneshot::channel();

        let manager = self.clone();
        let project_id = project_id.to_string();

        tokio::spawn(async move {
            let result = match manager.store.get_project(&project_id) {
                Ok(project) => manager.do_delete(&project).await,
                Err(e) => Err(e),
            };

            let _ = tx.send(result);
        });

        rx
    }

    async fn get_project(&self, project_id: &str) -> AppResult<Project> {
        self.store.get_project(project_id)
    }

    async fn get_projects(&self) -> AppResult<Vec<Project>> {
        Ok(self.store.get_projects())
    }

    async fn create_file(&self, project_id: &str, path: &str, content: &str) -> AppResult<File> {
        tracing::debug!(project_id, path, "Creating file");

        let project = self.store.get_project(project_id)?;
        let file = self
            .file_manager
            .create_file(&self.rooted(&project), path, content)
            .await?;

        Ok(self.with_diagnostics(&project, file).await)
    }

    async fn read_file(&self, project_id: &str, path: &str) -> AppResult<File> {
        tracing::debug!(project_id, path, "Reading file");

        let project = self.store.get_project(project_id)?;
        let file = self
            .file_manager
            .read_file(&self.rooted(&project), path)
            .await?;

        Ok(self.with_diagnostics(&project, file).await)
    }

    async fn update_file(&self, project_id: &str, path: &str, content: &str) -> AppResult<File> {
        tracing::debug!(project_id, path, "Updating file");

        let project = self.store.get_project(project_id)?;
        let file = self
            .file_manager
            .update_file(&self.rooted(&project), path, content)
            .await?;

        Ok(self.with_diagnostics(&project, file).await)
    }

    async fn delete_file(&self, project_id: &str, path: &str) -> AppResult<()> {
        tracing::debug!(project_id, path, "Deleting file");

        let project = self.store.get_project(project_id)?;

        self.file_manager
            .delete_file(&self.rooted(&project), path)
            .await
    }

    async fn list_files(
        &self,
        project_id: &str,
        show_hidden: bool,
        filter: PatternFilter,
    ) -> AppResult<Vec<File>> {
        tracing::debug!(project_id, "Listing files");

        let project = self.store.get_project(project_id)?;
        let fs = self.rooted(&project);

        let excludes = self.gitignore_excludes(&fs).await?;
        let mut options = ListOptions::default().with_filter(filter.with_excludes(excludes));
        options.show_hidden = show_hidden;

        self.file_manager.list_files(&fs, options).await
    }

    async fn apply_patch(&self, project_id: &str, path: &str, patch: &str) -> AppResult<File> {
        tracing::debug!(project_id, path, "Patching file");

        let project = self.store.get_project(project_id)?;
        let file = self
            .file_manager
            .apply_patch(&self.rooted(&project), path, patch)
            .await?;

        Ok(self.with_diagnostics(&project, file).await)
    }

    async fn update_lines(
        &self,
        project_id: &str,
        path: &str,
        chunk: LineDiffChunk,
    ) -> AppResult<File> {
        tracing::debug!(project_id, path, "Replacing lines in file");

        let project = self.store.get_project(project_id)?;
        let file = self
            .file_manager
            .update_lines(&self.rooted(&project), path, &chunk)
            .await?;

        Ok(self.with_diagnostics(&project, file).await)
    }

    async fn search_content(
        &self,
        project_id: &str,
        search: ContentSearch,
        filter: PatternFilter,
    ) -> AppResult<Vec<File>> {
        tracing::debug!(project_id, "Searching file contents");

        let project = self.store.get_project(project_id)?;
        let fs = self.rooted(&project);

        let excludes = self.gitignore_excludes(&fs).await?;

        self.file_manager
            .search_content(&fs, &search, filter.with_excludes(excludes))
            .await
    }

    async fn create_task(&self, project_id: &str, command: &str) -> AppResult<TaskResult> {
        tracing::debug!(project_id, command, "Creating task");

        let project = self.store.get_project(project_id)?;

        let argv = vec![
            TASK_SHELL.to_string(),
            "-c".to_string(),
            command.to_string(),
        ];
        let result = self.runner.exec(&project.container_id, &argv).await?;

        tracing::debug!(project_id, command, exit_code = result.exit_code, "Task completed");

        Ok(result.into())
    }

    async fn resolve_task_alias(&self, project_id: &str, alias: &str) -> AppResult<Task> {
        tracing::debug!(project_id, alias, "Resolving task alias");

        let project = self.store.get_project(project_id)?;

        project.find_task_by_alias(alias)
    }

    async fn search_symbols(
        &self,
        project_id: &str,
        query: &str,
        filter: SymbolFilter,
    ) -> AppResult<Vec<SymbolInfo>> {
        tracing::debug!(project_id, query, "Searching symbols");

        let project = self.store.get_project(project_id)?;

        self.lsp.workspace_symbols(&project, query, &filter).await
    }

    async fn cleanup(&self, deadline: Duration) -> AppResult<()> {
        tracing::info!("Cleaning up projects");

        let projects = self.store.get_projects();

        let tasks = projects.into_iter().map(|project| {
            let manager = self.clone();
            async move {
                manager
                    .do_delete(&project)
                    .await
                    .map_err(|e| format!("failed to clean up project {}: {e}", project.id))
            }
        });

        let results = tokio::time::timeout(deadline, futures::future::join_all(tasks))
            .await
            .map_err(|_| AppError::Internal(anyhow::anyhow!("cleanup timed out")))?;

        let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();

        if !errors.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "errors occurred during cleanup: {}",
                errors.join("; ")
            )));
        }

        tracing::info!("Cleaned up projects");

        Ok(())
    }
}

fn validate_task_aliases(config: &DevContainerConfig) -> AppResult<()> {
    let mut seen = std::collections::HashSet::new();

    for task in config.tasks() {
        if !seen.insert(task.alias.as_str()) {
            return Err(AppError::Validation(format!(
                "duplicate task alias: {}",
                task.alias
            )));
        }
    }

    Ok(())
}

async fn remove_project_dir(project_path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(project_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::error!(path = %project_path.display(), error = %e, "Failed to remove project directory");
        }
        return;
    }

    tracing::debug!(path = %project_path.display(), "Removed project directory");
}
