//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 8080
//!
//! [session]
//! workspace_root = "workspace"
//! pool_size = 3
//!
//! [processes]
//! script_roots = ["./scripts"]
//! catalog_dirs = []
//!
//! [execution]
//! auto_mode = "async"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default values shared by the config file and the runtime structs.
pub mod defaults {
    pub const DEFAULT_BIND: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_WORKSPACE_ROOT: &str = "workspace";
    /// Per-session pool size. Small on purpose: sessions are isolated sandboxes.
    pub const DEFAULT_POOL_SIZE: usize = 3;
    pub const DEFAULT_DATABASE_FILE: &str = "session.db";
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoserveConfig {
    /// HTTP server settings.
    pub server: Option<ServerSection>,

    /// Per-session sandbox settings.
    pub session: Option<SessionSection>,

    /// Process discovery settings.
    pub processes: Option<ProcessesSection>,

    /// Execution policy settings.
    pub execution: Option<ExecutionSection>,
}

impl GeoserveConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: GeoserveConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.processes.is_some() {
            self.processes = other.processes;
        }
        if other.execution.is_some() {
            self.execution = other.execution;
        }
    }

    /// Effective server section (defaults when absent).
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// Effective session section (defaults when absent).
    pub fn session(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Effective processes section (defaults when absent).
    pub fn processes(&self) -> ProcessesSection {
        self.processes.clone().unwrap_or_default()
    }

    /// Effective execution section (defaults when absent).
    pub fn execution(&self) -> ExecutionSection {
        self.execution.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref session) = self.session
            && session.pool_size == 0
        {
            return Err(ConfigError::Invalid {
                field: "session.pool_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(ref session) = self.session
            && session.database_file.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "session.database_file".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: defaults::DEFAULT_BIND.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

/// Session sandbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Directory under which one workspace per session token is created.
    pub workspace_root: PathBuf,
    /// Number of concurrent process invocations per session.
    pub pool_size: usize,
    /// Database file name inside each session workspace.
    pub database_file: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from(defaults::DEFAULT_WORKSPACE_ROOT),
            pool_size: defaults::DEFAULT_POOL_SIZE,
            database_file: defaults::DEFAULT_DATABASE_FILE.to_string(),
        }
    }
}

/// Process discovery configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessesSection {
    /// Directories holding script manifests. `file:` identifiers must point
    /// inside one of them; an empty list allows any path.
    pub script_roots: Vec<PathBuf>,
    /// Directories holding additional catalog manifests.
    pub catalog_dirs: Vec<PathBuf>,
}

/// Execution policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// What `mode=auto` resolves to.
    pub auto_mode: AutoMode,
}

/// Resolution of `mode=auto`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMode {
    /// Block the caller until the job is terminal.
    Sync,
    /// Return the accepted job immediately.
    #[default]
    Async,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GeoserveConfig::from_toml("").unwrap();
        assert!(config.server.is_none());
        assert_eq!(config.server().port, defaults::DEFAULT_PORT);
        assert_eq!(config.session().pool_size, 3);
        assert_eq!(config.execution().auto_mode, AutoMode::Async);
    }

    #[test]
    fn test_parse_full_config() {
        let config = GeoserveConfig::from_toml(
            r#"
[server]
bind = "0.0.0.0"
port = 9000

[session]
workspace_root = "/var/lib/geoserve"
pool_size = 5

[processes]
script_roots = ["/srv/scripts"]

[execution]
auto_mode = "sync"
"#,
        )
        .unwrap();

        assert_eq!(config.server().bind, "0.0.0.0");
        assert_eq!(config.server().port, 9000);
        assert_eq!(config.session().pool_size, 5);
        assert_eq!(config.session().database_file, "session.db");
        assert_eq!(
            config.processes().script_roots,
            vec![PathBuf::from("/srv/scripts")]
        );
        assert_eq!(config.execution().auto_mode, AutoMode::Sync);
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let err = GeoserveConfig::from_toml("[session]\npool_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "session.pool_size"));
    }

    #[test]
    fn test_unknown_auto_mode_rejected() {
        let err = GeoserveConfig::from_toml("[execution]\nauto_mode = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_overrides_by_section() {
        let mut base = GeoserveConfig::from_toml("[server]\nport = 1000\n[session]\npool_size = 2\n")
            .unwrap();
        let overlay = GeoserveConfig::from_toml("[server]\nport = 2000\n").unwrap();
        base.merge(overlay);

        assert_eq!(base.server().port, 2000);
        assert_eq!(base.session().pool_size, 2);
    }
}
