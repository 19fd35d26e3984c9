//! CLI command handlers.

pub mod processes;
pub mod start;

use std::path::{Path, PathBuf};

use anyhow::Result;
use geoserve_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Load an explicit config file, or discover the layered one.
pub fn load_config(explicit: Option<&Path>, ctx: &Context) -> Result<LoadedConfig> {
    let loaded = match explicit {
        Some(path) => LoadedConfig::from_file(path)?,
        None => geoserve_config::load_config(None)?,
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    if ctx.verbose {
        let sources = loaded.loaded_from();
        if sources.is_empty() {
            println!("No config files found, using defaults + CLI args");
        } else {
            for source in sources {
                println!("Loaded config: {}", source.display());
            }
        }
    }

    Ok(loaded)
}

/// CLI script roots replace the configured ones when given.
pub fn script_roots(cli: &[PathBuf], configured: Vec<PathBuf>) -> Vec<PathBuf> {
    if cli.is_empty() {
        configured
    } else {
        cli.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_script_roots_override_config() {
        let configured = vec![PathBuf::from("/etc/geoserve/scripts")];
        assert_eq!(script_roots(&[], configured.clone()), configured);

        let cli = vec![PathBuf::from("./scripts")];
        assert_eq!(script_roots(&cli, configured), cli);
    }

    #[test]
    fn test_explicit_config_file_is_the_only_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geoserve.toml");
        std::fs::write(&path, "[server]\nport = 9191\n").unwrap();

        let loaded = load_config(Some(&path), &Context { verbose: false }).unwrap();
        assert_eq!(loaded.config.server().port, 9191);
        assert_eq!(loaded.loaded_from(), vec![path.as_path()]);
    }
}
