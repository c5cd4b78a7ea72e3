//! Devcontainer runner: image provisioning, container startup, lifecycle hooks

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::devcontainer::container_manager::{ContainerManager, ExecResult};
use crate::devcontainer::executor::Executor;
use crate::devcontainer::image_manager::ImageManager;
use crate::error::{AppError, AppResult};
use crate::models::{DevContainerConfig, devcontainer::LifecycleCommand};

/// Drives a devcontainer from config to running container
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runner: Send + Sync {
    /// Provision and start a container for the project; returns the container
    /// id. Fail-fast: the first failing step aborts the rest. Rollback of
    /// partial state is the caller's responsibility.
    async fn run(&self, project_path: &Path, config: &DevContainerConfig) -> AppResult<String>;

    async fn stop(&self, container_id: &str) -> AppResult<()>;

    async fn exec(&self, container_id: &str, command: &[String]) -> AppResult<ExecResult>;
}

/// Runner backed by the Docker API
pub struct DockerRunner {
    executor: Arc<dyn Executor>,
    image_manager: ImageManager,
    container_manager: ContainerManager,
}

impl DockerRunner {
    pub fn new(
        executor: Arc<dyn Executor>,
        image_manager: ImageManager,
        container_manager: ContainerManager,
    ) -> Self {
        Self {
            executor,
            image_manager,
            container_manager,
        }
    }

    /// Run each command of a lifecycle hook on the host, in order
    async fn run_host_hook(
        &self,
        hook: Option<&LifecycleCommand>,
        working_dir: &Path,
    ) -> AppResult<()> {
        let Some(hook) = hook else { return Ok(()) };

        for command in hook.commands() {
            tracing::debug!(?command, "Running host lifecycle command");
            self.executor.run(command, working_dir).await?;
        }

        Ok(())
    }

    /// Run each command of a lifecycle hook inside the container, in order.
    /// A non-zero exit aborts with the captured output.
    async fn run_container_hook(
        &self,
        hook: Option<&LifecycleCommand>,
        container_id: &str,
    ) -> AppResult<()> {
        let Some(hook) = hook else { return Ok(()) };

        for command in hook.commands() {
            tracing::debug!(?command, container_id, "Running container lifecycle command");

            let result = self.container_manager.exec(container_id, command).await?;

            if result.exit_code != 0 {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "command {:?} exited with code {}. Stdout: {}, Stderr: {}",
                    command,
                    result.exit_code,
                    result.stdout,
                    result.stderr
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Runner for DockerRunner {
    async fn run(&self, project_path: &Path, config: &DevContainerConfig) -> AppResult<String> {
        tracing::debug!(project_path = %project_path.display(), "Running devcontainer");

        let lifecycle = &config.lifecycle;

        self.run_host_hook(lifecycle.initialize_command.as_ref(), project_path)
            .await?;

        let image_id = if config.is_image_dev_container() {
            let image = config.image.as_deref().unwrap_or_default();
            self.image_manager.pull_image(image).await?;
            image.to_string()
        } else if config.is_dockerfile_dev_container() {
            self.image_manager.build_image(project_path, config).await?
        } else if config.is_compose_dev_container() {
            return Err(AppError::Unsupported(
                "Docker Compose devcontainers are not supported".to_string(),
            ));
        } else {
            return Err(AppError::Unsupported(
                "invalid devcontainer configuration: no image, dockerfile, or compose file"
                    .to_string(),
            ));
        };

        let container_id = self
            .container_manager
            .create_container(&image_id, project_path, config)
            .await?;

        self.container_manager.start_container(&container_id).await?;

        self.run_container_hook(lifecycle.on_create_command.as_ref(), &container_id)
            .await?;
        self.run_container_hook(lifecycle.update_content_command.as_ref(), &container_id)
            .await?;
        self.run_container_hook(lifecycle.post_create_command.as_ref(), &container_id)
            .await?;

        self.run_host_hook(lifecycle.post_start_command.as_ref(), project_path)
            .await?;
        self.run_host_hook(lifecycle.post_attach_command.as_ref(), project_path)
            .await?;

        Ok(container_id)
    }

    async fn stop(&self, container_id: &str) -> AppResult<()> {
        self.container_manager.stop_container(container_id).await
    }

    async fn exec(&self, container_id: &str, command: &[String]) -> AppResult<ExecResult> {
        self.container_manager.exec(container_id, command).await
    }
}
