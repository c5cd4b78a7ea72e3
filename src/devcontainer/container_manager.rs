//! Docker container management for project workspaces

use std::collections::HashMap;
use std::path::Path;

use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::{ContainerCreateBody, HostConfig, MountTypeEnum, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, StartContainerOptions, StopContainerOptions,
};
use futures::StreamExt;

use crate::constants::{CONTAINER_SENTINEL_COMMAND, DEFAULT_WORKSPACE_FOLDER};
use crate::error::{AppError, AppResult};
use crate::models::{DevContainerConfig, Mount};

/// Captured output of an in-container command. A non-zero exit code is a
/// value, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

/// Container lifecycle and exec against the Docker API
pub struct ContainerManager {
    docker: Docker,
}

impl ContainerManager {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Create a container for the project: idle sentinel command, environment,
    /// user, app ports bound to 127.0.0.1, and the workspace mount.
    pub async fn create_container(
        &self,
        image_id: &str,
        project_path: &Path,
        config: &DevContainerConfig,
    ) -> AppResult<String> {
        let env: Vec<String> = config
            .container_env
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for port in &config.app_port {
            let key = format!("{port}/tcp");
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: Some("127.0.0.1".to_string()),
                    host_port: Some(port.to_string()),
                }]),
            );
        }

        let (workspace_mount, working_dir) = workspace_mount(project_path, config)?;

        let mut mounts = vec![workspace_mount];
        for mount in &config.mounts {
            mounts.push(to_docker_mount(mount)?);
        }

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            mounts: Some(mounts),
            init: Some(config.init),
            privileged: Some(config.privileged),
            cap_add: Some(config.cap_add.clone()),
            security_opt: Some(config.security_opt.clone()),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(image_id.to_string()),
            cmd: Some(
                CONTAINER_SENTINEL_COMMAND
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            env: Some(env),
            user: config.container_user.clone().filter(|u| !u.is_empty()),
            working_dir: Some(working_dir),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptionsBuilder::default().build();
        let container = self.docker.create_container(Some(options), body).await?;

        tracing::debug!(container_id = %container.id, "Created container");

        Ok(container.id)
    }

    pub async fn start_container(&self, container_id: &str) -> AppResult<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions>)
            .await?;

        Ok(())
    }

    pub async fn stop_container(&self, container_id: &str) -> AppResult<()> {
        self.docker
            .stop_container(container_id, None::<StopContainerOptions>)
            .await?;

        Ok(())
    }

    /// Execute a command in the container. The runtime multiplexes stdout and
    /// stderr onto one stream with framing headers; frames are demultiplexed
    /// here by type, never merged raw.
    pub async fn exec(&self, container_id: &str, command: &[String]) -> AppResult<ExecResult> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(command.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(frame) = output.next().await {
                match frame? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        let exit_code = inspect.exit_code.unwrap_or(-1);

        Ok(ExecResult {
            stdout,
            stderr,
            exit_code,
        })
    }
}

/// The workspace bind mount and container working directory: the config's
/// mount + folder when both are present, otherwise the project directory
/// bound to `/workspace`.
fn workspace_mount(
    project_path: &Path,
    config: &DevContainerConfig,
) -> AppResult<(bollard::models::Mount, String)> {
    if let (Some(mount), Some(folder)) = (&config.workspace_mount, &config.workspace_folder) {
        let mut docker_mount = to_docker_mount(mount)?;
        if docker_mount.source.is_none() {
            docker_mount.source = Some(project_path.to_string_lossy().into_owned());
        }

        return Ok((docker_mount, folder.clone()));
    }

    let mount = bollard::models::Mount {
        typ: Some(MountTypeEnum::BIND),
        source: Some(project_path.to_string_lossy().into_owned()),
        target: Some(DEFAULT_WORKSPACE_FOLDER.to_string()),
        ..Default::default()
    };

    Ok((mount, DEFAULT_WORKSPACE_FOLDER.to_string()))
}

fn to_docker_mount(mount: &Mount) -> AppResult<bollard::models::Mount> {
    Ok(bollard::models::Mount {
        typ: Some(map_mount_type(&mount.mount_type)?),
        source: mount.source.clone(),
        target: Some(mount.target.clone()),
        ..Default::default()
    })
}

fn map_mount_type(mount_type: &str) -> AppResult<MountTypeEnum> {
    match mount_type {
        "bind" => Ok(MountTypeEnum::BIND),
        "volume" => Ok(MountTypeEnum::VOLUME),
        "tmpfs" => Ok(MountTypeEnum::TMPFS),
        "npipe" => Ok(MountTypeEnum::NPIPE),
        "cluster" => Ok(MountTypeEnum::CLUSTER),
        other => Err(AppError::Unsupported(format!("unknown mount type: {other}"))),
    }
}
