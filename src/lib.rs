//! Hide - Headless Development Environment Broker
//!
//! Hide opens a source repository as a *project*: it clones the repository,
//! provisions an isolated container matching the repository's devcontainer
//! configuration, and exposes file and task operations against the container's
//! workspace, enriched with language-server diagnostics and symbol search.
//!
//! # Architecture
//!
//! The application follows a layered architecture:
//! - **Handlers**: HTTP request handlers (thin layer)
//! - **Project manager**: orchestration across git, Docker, files, and LSP
//! - **Services**: devcontainer runner, file manager, git service, LSP service
//! - **Models**: domain models and DTOs

pub mod config;
pub mod constants;
pub mod devcontainer;
pub mod error;
pub mod files;
pub mod git;
pub mod handlers;
pub mod lsp;
pub mod models;
pub mod project;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
