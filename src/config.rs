//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, HIDE_DIR, PROJECTS_DIR, REPOSITORIES_DIR,
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub docker: DockerConfig,
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

/// Docker registry configuration
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Registry username (`DOCKER_USER`); absence is a warning, not an error
    pub user: Option<String>,
    /// Registry token (`DOCKER_TOKEN`)
    pub token: Option<String>,
}

/// On-disk state layout
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root state directory, `$HOME/.hide` unless overridden by `HIDE_HOME`
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            docker: DockerConfig::from_env(),
            storage: StorageConfig::from_env()?,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HIDE_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: env::var("HIDE_PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HIDE_PORT".to_string()))?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl DockerConfig {
    fn from_env() -> Self {
        Self {
            user: env::var("DOCKER_USER").ok().filter(|v| !v.is_empty()),
            token: env::var("DOCKER_TOKEN").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let root = match env::var("HIDE_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .ok_or_else(|| ConfigError::Missing("HOME".to_string()))?
                .join(HIDE_DIR),
        };

        Ok(Self { root })
    }

    /// Directory holding per-project working trees
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    /// Directory holding the git clone cache
    pub fn repositories_dir(&self) -> PathBuf {
        self.root.join(REPOSITORIES_DIR)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
