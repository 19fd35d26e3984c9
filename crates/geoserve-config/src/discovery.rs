//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/geoserve/config.toml` (user config)
//! 2. `./geoserve.toml` (project-local)
//! 3. CLI arguments (handled by the binary)

use std::path::{Path, PathBuf};

use crate::{ConfigError, GeoserveConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "geoserve.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "geoserve";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "GEOSERVE_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// File under the user config directory.
    User,
    /// `geoserve.toml` in the project directory.
    Project,
    /// File named on the command line; discovery is skipped.
    Explicit,
}

/// One config file that discovery looked at.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    /// False when the file was absent or malformed.
    pub loaded: bool,
}

/// Merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GeoserveConfig,
    /// Lowest precedence first.
    pub sources: Vec<ConfigSource>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Load exactly one file. Read and parse errors are fatal here.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: load_config_file(path)?,
            sources: vec![ConfigSource {
                layer: ConfigLayer::Explicit,
                path: path.to_path_buf(),
                loaded: true,
            }],
            warnings: Vec::new(),
        })
    }

    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Discover the user and project layers and merge them.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with the user config directory pinned.
///
/// `config_dir` wins over `GEOSERVE_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = config_dir
        .map(|d| d.join(USER_CONFIG_FILE))
        .or_else(user_config_path);
    let project = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));

    let layers = user
        .map(|p| (ConfigLayer::User, p))
        .into_iter()
        .chain(std::iter::once((ConfigLayer::Project, project)));

    let mut loaded = LoadedConfig {
        config: GeoserveConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };
    for (layer, path) in layers {
        let ok = match read_layer(&path) {
            Ok(Some(cfg)) => {
                loaded.config.merge(cfg);
                true
            }
            Ok(None) => false,
            Err(e) => {
                loaded
                    .warnings
                    .push(format!("Failed to load {}: {}", path.display(), e));
                false
            }
        };
        loaded.sources.push(ConfigSource {
            layer,
            path,
            loaded: ok,
        });
    }
    Ok(loaded)
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<GeoserveConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    GeoserveConfig::from_toml(&contents)
}

pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `GEOSERVE_CONFIG_DIR` if set and non-empty, else `<platform config dir>/geoserve`.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

// Absent files are not an error.
fn read_layer(path: &Path) -> Result<Option<GeoserveConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    load_config_file(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_no_files() {
        let dir = TempDir::new().unwrap();
        let empty_config_dir = TempDir::new().unwrap();
        let loaded =
            load_config_with_options(Some(dir.path()), Some(empty_config_dir.path())).unwrap();
        assert!(loaded.config.server.is_none());
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_load_config_layered_merge() {
        let user_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();

        fs::write(
            user_dir.path().join("config.toml"),
            "[server]\nport = 8080\n\n[session]\npool_size = 4\n",
        )
        .unwrap();
        fs::write(
            project_dir.path().join("geoserve.toml"),
            "[server]\nport = 3000\n",
        )
        .unwrap();

        let loaded =
            load_config_with_options(Some(project_dir.path()), Some(user_dir.path())).unwrap();

        assert_eq!(loaded.config.server().port, 3000);
        assert_eq!(loaded.config.session().pool_size, 4);
        let layers: Vec<_> = loaded.sources.iter().map(|s| s.layer).collect();
        assert_eq!(layers, vec![ConfigLayer::User, ConfigLayer::Project]);
        assert!(loaded.sources.iter().all(|s| s.loaded));
    }

    #[test]
    fn test_malformed_config_warns_but_continues() {
        let dir = TempDir::new().unwrap();
        let empty_config_dir = TempDir::new().unwrap();
        fs::write(dir.path().join("geoserve.toml"), "not valid toml {{{{").unwrap();

        let loaded =
            load_config_with_options(Some(dir.path()), Some(empty_config_dir.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("geoserve.toml"));
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.config, GeoserveConfig::new());
    }

    #[test]
    fn test_from_file_marks_source_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[execution]\nauto_mode = \"sync\"\n").unwrap();

        let loaded = LoadedConfig::from_file(&path).unwrap();
        assert_eq!(loaded.loaded_from(), vec![path.as_path()]);
        assert_eq!(loaded.sources[0].layer, ConfigLayer::Explicit);
    }
}
