//! Devcontainer configuration model
//!
//! Mirrors the devcontainer.json format closely enough to drive provisioning:
//! the three mutually exclusive variants (image / dockerfile / compose), the
//! workspace and additional mounts, lifecycle hooks, and the
//! `customizations.hide.tasks` extension.
//!
//! The on-disk format is JSONC; parsing goes through `json5` which accepts
//! comments and trailing commas.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::project::Task;

/// Resolved devcontainer configuration for a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevContainerConfig {
    pub name: Option<String>,

    /// Image variant: pull this image
    pub image: Option<String>,

    /// Dockerfile variant, legacy top-level form
    #[serde(alias = "dockerFile")]
    pub dockerfile: Option<String>,
    pub context: Option<String>,

    /// Dockerfile variant, nested form; takes precedence over the top level
    pub build: Option<BuildProps>,

    /// Compose variant marker; provisioning fails fast when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_compose_file: Option<serde_json::Value>,

    /// Application ports exposed on 127.0.0.1
    #[serde(deserialize_with = "de_app_ports")]
    pub app_port: Vec<u16>,

    pub container_env: HashMap<String, String>,
    pub container_user: Option<String>,

    pub mounts: Vec<Mount>,
    pub workspace_mount: Option<Mount>,
    pub workspace_folder: Option<String>,

    pub init: bool,
    pub privileged: bool,
    pub cap_add: Vec<String>,
    pub security_opt: Vec<String>,

    #[serde(flatten)]
    pub lifecycle: LifecycleProps,

    pub customizations: Customizations,

    /// Directory containing the config file, relative to the project root.
    /// Dockerfile and context paths resolve against it.
    #[serde(skip)]
    pub path: String,
}

impl DevContainerConfig {
    pub fn is_image_dev_container(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_dockerfile_dev_container(&self) -> bool {
        self.dockerfile.is_some()
            || self
                .build
                .as_ref()
                .is_some_and(|build| build.dockerfile.is_some())
    }

    pub fn is_compose_dev_container(&self) -> bool {
        self.docker_compose_file.is_some()
    }

    /// Named tasks declared under `customizations.hide.tasks`
    pub fn tasks(&self) -> &[Task] {
        &self.customizations.hide.tasks
    }
}

/// Nested build properties of the dockerfile variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildProps {
    pub dockerfile: Option<String>,
    pub context: Option<String>,
    pub args: HashMap<String, String>,
    #[serde(deserialize_with = "de_one_or_many")]
    pub cache_from: Vec<String>,
    pub target: Option<String>,
}

/// A mount declaration: either the object form or the
/// `source=…,target=…,type=…` string form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mount {
    #[serde(rename = "type")]
    pub mount_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub target: String,
}

impl FromStr for Mount {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mount_type = String::from("bind");
        let mut source = None;
        let mut target = None;

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part.split_once('=').ok_or_else(|| {
                AppError::Unsupported(format!("invalid mount declaration: {s}"))
            })?;

            match key.trim() {
                "type" => mount_type = value.trim().to_string(),
                "source" | "src" => source = Some(value.trim().to_string()),
                "target" | "dst" | "destination" => target = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let target =
            target.ok_or_else(|| AppError::Unsupported(format!("mount without target: {s}")))?;

        Ok(Self {
            mount_type,
            source,
            target,
        })
    }
}

impl<'de> Deserialize<'de> for Mount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                #[serde(rename = "type", default)]
                mount_type: Option<String>,
                #[serde(default)]
                source: Option<String>,
                #[serde(alias = "destination")]
                target: String,
            },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Mount::from_str(&text).map_err(serde::de::Error::custom),
            Raw::Object {
                mount_type,
                source,
                target,
            } => Ok(Mount {
                mount_type: mount_type.unwrap_or_else(|| "bind".to_string()),
                source,
                target,
            }),
        }
    }
}

/// The six optional lifecycle hook command lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleProps {
    pub initialize_command: Option<LifecycleCommand>,
    pub on_create_command: Option<LifecycleCommand>,
    pub update_content_command: Option<LifecycleCommand>,
    pub post_create_command: Option<LifecycleCommand>,
    pub post_start_command: Option<LifecycleCommand>,
    pub post_attach_command: Option<LifecycleCommand>,
}

/// A lifecycle hook: an ordered list of argv commands.
///
/// Deserializes from the three devcontainer forms: a shell string (wrapped in
/// `/bin/sh -c`), an argv array, or an object of named commands (each value
/// again a string or argv).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LifecycleCommand(pub Vec<Vec<String>>);

impl LifecycleCommand {
    pub fn commands(&self) -> &[Vec<String>] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for LifecycleCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Single {
            Shell(String),
            Argv(Vec<String>),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Command(Single),
            Named(BTreeMap<String, Single>),
        }

        fn into_argv(single: Single) -> Vec<String> {
            match single {
                Single::Shell(command) => vec![
                    "/bin/sh".to_string(),
                    "-c".to_string(),
                    command,
                ],
                Single::Argv(argv) => argv,
            }
        }

        let commands = match Raw::deserialize(deserializer)? {
            Raw::Command(single) => vec![into_argv(single)],
            Raw::Named(named) => named.into_values().map(into_argv).collect(),
        };

        Ok(Self(commands))
    }
}

/// Tool-specific configuration extensions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customizations {
    pub hide: HideCustomizations,
}

/// Hide's own customization block: named tasks with unique aliases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HideCustomizations {
    pub tasks: Vec<Task>,
}

fn de_app_ports<'de, D>(deserializer: D) -> Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(u16),
        Many(Vec<u16>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(port) => vec![port],
        Raw::Many(ports) => ports,
    })
}

fn de_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(value) => vec![value],
        Raw::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_variant() {
        let config: DevContainerConfig = json5::from_str(
            r#"{
                // base image
                "name": "My Project",
                "image": "mcr.microsoft.com/devcontainers/go:1.22",
                "appPort": 3000,
            }"#,
        )
        .unwrap();

        assert!(config.is_image_dev_container());
        assert!(!config.is_dockerfile_dev_container());
        assert!(!config.is_compose_dev_container());
        assert_eq!(config.app_port, vec![3000]);
    }

    #[test]
    fn test_parse_dockerfile_variant() {
        let config: DevContainerConfig = json5::from_str(
            r#"{
                "build": {
                    "dockerfile": "Dockerfile",
                    "context": "..",
                    "args": {"VARIANT": "1.22"},
                    "cacheFrom": "ghcr.io/acme/cache",
                    "target": "dev"
                }
            }"#,
        )
        .unwrap();

        assert!(config.is_dockerfile_dev_container());
        let build = config.build.unwrap();
        assert_eq!(build.dockerfile.as_deref(), Some("Dockerfile"));
        assert_eq!(build.cache_from, vec!["ghcr.io/acme/cache".to_string()]);
        assert_eq!(build.args.get("VARIANT").map(String::as_str), Some("1.22"));
    }

    #[test]
    fn test_legacy_docker_file_alias() {
        let config: DevContainerConfig =
            json5::from_str(r#"{"dockerFile": "Dockerfile.dev"}"#).unwrap();
        assert!(config.is_dockerfile_dev_container());
        assert_eq!(config.dockerfile.as_deref(), Some("Dockerfile.dev"));
    }

    #[test]
    fn test_compose_variant_detected() {
        let config: DevContainerConfig =
            json5::from_str(r#"{"dockerComposeFile": "docker-compose.yml"}"#).unwrap();
        assert!(config.is_compose_dev_container());
    }

    #[test]
    fn test_lifecycle_command_forms() {
        let config: DevContainerConfig = json5::from_str(
            r#"{
                "image": "alpine",
                "onCreateCommand": "npm install",
                "postCreateCommand": ["make", "setup"],
                "postStartCommand": {"server": "npm start", "lint": ["make", "lint"]}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.lifecycle.on_create_command.as_ref().unwrap().0,
            vec![vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "npm install".to_string()
            ]]
        );
        assert_eq!(
            config.lifecycle.post_create_command.as_ref().unwrap().0,
            vec![vec!["make".to_string(), "setup".to_string()]]
        );
        // named commands, in key order
        assert_eq!(
            config.lifecycle.post_start_command.as_ref().unwrap().0.len(),
            2
        );
    }

    #[test]
    fn test_mount_string_form() {
        let mount: Mount = "source=/var/run/docker.sock,target=/var/run/docker.sock,type=bind"
            .parse()
            .unwrap();
        assert_eq!(mount.mount_type, "bind");
        assert_eq!(mount.source.as_deref(), Some("/var/run/docker.sock"));
        assert_eq!(mount.target, "/var/run/docker.sock");
    }

    #[test]
    fn test_mount_string_without_target_fails() {
        assert!("source=/tmp,type=bind".parse::<Mount>().is_err());
    }

    #[test]
    fn test_mounts_accept_both_forms() {
        let config: DevContainerConfig = json5::from_str(
            r#"{
                "mounts": [
                    "source=vol,target=/data,type=volume",
                    {"type": "tmpfs", "target": "/scratch"}
                ],
                "workspaceMount": "source=.,target=/code,type=bind",
                "workspaceFolder": "/code"
            }"#,
        )
        .unwrap();

        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[1].mount_type, "tmpfs");
        assert_eq!(config.workspace_mount.as_ref().unwrap().target, "/code");
    }

    #[test]
    fn test_tasks_from_customizations() {
        let config: DevContainerConfig = json5::from_str(
            r#"{
                "image": "golang:1.22",
                "customizations": {
                    "hide": {
                        "tasks": [{"alias": "test", "command": "go test ./..."}]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.tasks().len(), 1);
        assert_eq!(config.tasks()[0].alias, "test");
    }
}
