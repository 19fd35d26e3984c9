//! Start command - launches the WPS server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use geoserve_config::{AutoMode, GeoserveConfig};
use geoserve_process::{ExecutionEngine, FixedPolicy, JobJournalFactory, ProcessRegistry};
use geoserve_server::{AppState, Server, ServerConfig};
use geoserve_session::{ServiceFactoryRegistry, SessionBootstrapper, SessionConfig, SessionManager};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Path to config file (overrides default discovery)
    #[arg(long, env = "GEOSERVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Root directory for session workspaces (overrides config)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Script root directory (can be specified multiple times)
    #[arg(long)]
    pub scripts: Vec<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let loaded = super::load_config(args.config.as_deref(), ctx)?;
    let config = &loaded.config;

    let addr = bind_address(config, &args)?;
    let session_config = session_config(config, &args);
    let processes = config.processes();
    let script_roots = super::script_roots(&args.scripts, processes.script_roots);

    let registry = ProcessRegistry::standard(&processes.catalog_dirs, &script_roots)
        .context("Failed to load the process catalog")?;

    let policy = match config.execution().auto_mode {
        AutoMode::Sync => FixedPolicy::synchronous(),
        AutoMode::Async => FixedPolicy::asynchronous(),
    };

    if ctx.verbose {
        println!("Workspace root: {}", session_config.workspace_root.display());
        println!("Processes: {}", registry.offerings().len());
        for root in &script_roots {
            println!("Script root: {}", root.display());
        }
    }

    let bootstrapper = SessionBootstrapper::new(session_config)
        .with_factories(ServiceFactoryRegistry::new().with_factory(JobJournalFactory));

    let state = AppState::new(
        ServerConfig::new().with_bind_address(addr),
        registry,
        ExecutionEngine::new(policy),
        SessionManager::new(bootstrapper),
    );

    println!("geoserve listening on http://{}", addr);
    tracing::info!(%addr, "Starting geoserve");

    Server::from_state(state).run().await?;
    Ok(())
}

fn bind_address(config: &GeoserveConfig, args: &StartArgs) -> Result<SocketAddr> {
    let server = config.server();
    let bind = args.bind.clone().unwrap_or(server.bind);
    let port = args.port.unwrap_or(server.port);
    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;
    Ok(SocketAddr::new(ip, port))
}

fn session_config(config: &GeoserveConfig, args: &StartArgs) -> SessionConfig {
    let section = config.session();
    SessionConfig::new()
        .with_workspace_root(args.workspace.clone().unwrap_or(section.workspace_root))
        .with_pool_size(section.pool_size)
        .with_database_file(section.database_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> StartArgs {
        StartArgs {
            config: None,
            bind: None,
            port: None,
            workspace: None,
            scripts: Vec::new(),
        }
    }

    #[test]
    fn test_bind_address_from_config() {
        let config = GeoserveConfig::from_toml("[server]\nbind = \"0.0.0.0\"\nport = 9000\n").unwrap();
        let addr = bind_address(&config, &args()).unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_cli_overrides_bind_and_port() {
        let config = GeoserveConfig::from_toml("[server]\nport = 9000\n").unwrap();
        let mut args = args();
        args.bind = Some("::1".into());
        args.port = Some(7000);
        let addr = bind_address(&config, &args).unwrap();
        assert_eq!(addr.to_string(), "[::1]:7000");
    }

    #[test]
    fn test_invalid_bind_is_an_error() {
        let mut args = args();
        args.bind = Some("localhost:80".into());
        assert!(bind_address(&GeoserveConfig::new(), &args).is_err());
    }

    #[test]
    fn test_workspace_override() {
        let config = GeoserveConfig::from_toml("[session]\npool_size = 5\n").unwrap();
        let mut args = args();
        args.workspace = Some(PathBuf::from("/tmp/ws"));
        let session = session_config(&config, &args);
        assert_eq!(session.workspace_root, PathBuf::from("/tmp/ws"));
        assert_eq!(session.pool_size, 5);
    }
}
