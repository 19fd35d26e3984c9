//! Configuration for session provisioning.

use std::path::PathBuf;

/// Default directory under which session workspaces are created.
pub const DEFAULT_WORKSPACE_ROOT: &str = "workspace";

/// Default number of concurrent invocations per session.
pub const DEFAULT_POOL_SIZE: usize = 3;

/// Default database file name inside a session workspace.
pub const DEFAULT_DATABASE_FILE: &str = "session.db";

/// Configuration for the session bootstrapper.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root directory; each session gets `<root>/<token>`.
    pub workspace_root: PathBuf,

    /// Permits in each session's worker pool.
    pub pool_size: usize,

    /// Database file created inside each workspace.
    pub database_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from(DEFAULT_WORKSPACE_ROOT),
            pool_size: DEFAULT_POOL_SIZE,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace root directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Set the per-session pool size (clamped to at least one).
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    /// Set the database file name.
    pub fn with_database_file(mut self, name: impl Into<String>) -> Self {
        self.database_file = name.into();
        self
    }
}
