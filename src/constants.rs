//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

use std::time::Duration;

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address (the API is local-only)
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// HTTP read/write budget for a single request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// STORAGE LAYOUT
// =============================================================================

/// Root state directory under `$HOME`
pub const HIDE_DIR: &str = ".hide";

/// Per-project working trees live under `$HOME/.hide/projects/{id}`
pub const PROJECTS_DIR: &str = "projects";

/// Git clone cache lives under `$HOME/.hide/repositories/{url-hash}`
pub const REPOSITORIES_DIR: &str = "repositories";

// =============================================================================
// PROJECT DEFAULTS
// =============================================================================

/// Length of the random project identifier token
pub const PROJECT_ID_LENGTH: usize = 10;

/// Length of the random suffix appended to built image tags
pub const IMAGE_TAG_SUFFIX_LENGTH: usize = 6;

/// Workspace mount point inside the container when the config does not
/// override it
pub const DEFAULT_WORKSPACE_FOLDER: &str = "/workspace";

/// Idle sentinel keeping the container alive for exec calls
pub const CONTAINER_SENTINEL_COMMAND: [&str; 3] = ["/bin/sh", "-c", "while sleep 1000; do :; done"];

/// Shell used for task execution inside the container
pub const TASK_SHELL: &str = "/bin/bash";

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Upper bound on the wait for language-server diagnostics per file operation
pub const MAX_DIAGNOSTICS_DELAY: Duration = Duration::from_secs(1);

/// Deadline for cleaning up all projects at shutdown
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// FILE READ DEFAULTS
// =============================================================================

/// Default first line returned by a file read
pub const DEFAULT_START_LINE: usize = 1;

/// Default number of lines returned by a file read
pub const DEFAULT_NUM_LINES: usize = 100;
