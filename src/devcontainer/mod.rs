//! Devcontainer provisioning
//!
//! Resolves a devcontainer configuration into a running container: image
//! pull/build, container create/start, and lifecycle hook execution on the
//! host and inside the container.

pub mod container_manager;
pub mod executor;
pub mod image_manager;
pub mod runner;

pub use container_manager::{ContainerManager, ExecResult};
pub use executor::{Executor, HostExecutor};
pub use image_manager::{ImageManager, RegistryCredentials};
pub use runner::{DockerRunner, Runner};

use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::DevContainerConfig;

/// Config locations probed in order, relative to the project root
const CONFIG_LOCATIONS: [&str; 2] = [".devcontainer/devcontainer.json", ".devcontainer.json"];

/// Locate and parse the project's devcontainer configuration. The directory
/// containing the config file is recorded so Dockerfile and context paths
/// resolve against it.
pub async fn config_from_project(project_path: &Path) -> AppResult<DevContainerConfig> {
    for location in CONFIG_LOCATIONS {
        let candidate = project_path.join(location);

        if tokio::fs::try_exists(&candidate).await? {
            let raw = tokio::fs::read_to_string(&candidate).await?;
            let mut config = parse_config(&raw)?;
            config.path = Path::new(location)
                .parent()
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default();

            return Ok(config);
        }
    }

    Err(AppError::Unsupported(
        "no devcontainer configuration found in repository".to_string(),
    ))
}

/// Parse devcontainer.json content (JSONC: comments and trailing commas)
pub fn parse_config(raw: &str) -> AppResult<DevContainerConfig> {
    json5::from_str(raw)
        .map_err(|e| AppError::Unsupported(format!("invalid devcontainer configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_discovery_prefers_dotdir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".devcontainer")).unwrap();
        std::fs::write(
            tmp.path().join(".devcontainer/devcontainer.json"),
            r#"{"image": "alpine"}"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join(".devcontainer.json"),
            r#"{"image": "debian"}"#,
        )
        .unwrap();

        let config = config_from_project(tmp.path()).await.unwrap();
        assert_eq!(config.image.as_deref(), Some("alpine"));
        assert_eq!(config.path, ".devcontainer");
    }

    #[tokio::test]
    async fn test_config_discovery_root_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(".devcontainer.json"),
            r#"{"image": "debian"}"#,
        )
        .unwrap();

        let config = config_from_project(tmp.path()).await.unwrap();
        assert_eq!(config.image.as_deref(), Some("debian"));
        assert_eq!(config.path, "");
    }

    #[tokio::test]
    async fn test_missing_config_is_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            config_from_project(tmp.path()).await.unwrap_err(),
            AppError::Unsupported(_)
        ));
    }
}
