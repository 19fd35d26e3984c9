//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use geoserve_process::{ExecutionEngine, JobJournalFactory, ProcessRegistry, ScriptResolver};
use geoserve_server::{AppState, SESSION_TOKEN_HEADER, Server, ServerConfig};
use geoserve_session::{ServiceFactoryRegistry, SessionBootstrapper, SessionConfig, SessionManager};

/// Script with eight inputs and an `ErrorMessage` output.
pub const CSV_TO_POINTS: &str = r#"
title = "CSV to points"
abstract = "Builds a points table description from CSV options."

[[inputs]]
name = "path"
[[inputs]]
name = "separators"
[[inputs]]
name = "id_column"
type = "identifier"
[[inputs]]
name = "x"
type = "integer"
[[inputs]]
name = "y"
type = "integer"
[[inputs]]
name = "header"
type = "boolean"
[[inputs]]
name = "overwrite"
type = "boolean"
[[inputs]]
name = "table"

[[outputs]]
name = "ErrorMessage"
[[outputs]]
name = "sum"
type = "integer"

[script]
statements = [
    "CREATE TABLE IF NOT EXISTS {{id_column}} (x INTEGER, y INTEGER)",
    "INSERT INTO {{id_column}} VALUES (:x, :y)",
    "SELECT :path || ' -> ' || :table AS ErrorMessage, :x + :y AS sum",
]
"#;

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Temporary directory for workspaces and scripts.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a new test server with the built-in catalog and one script.
    pub async fn start() -> Result<Self> {
        Self::start_with_engine(ExecutionEngine::default()).await
    }

    /// Start a new test server with a specific execution engine.
    pub async fn start_with_engine(engine: ExecutionEngine) -> Result<Self> {
        Self::start_with(
            engine,
            ServiceFactoryRegistry::new().with_factory(JobJournalFactory),
        )
        .await
    }

    /// Start a new test server with a specific engine and session services.
    pub async fn start_with(engine: ExecutionEngine, factories: ServiceFactoryRegistry) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let scripts = temp_dir.path().join("scripts");
        std::fs::create_dir_all(&scripts)?;
        std::fs::write(scripts.join("csv_to_points.toml"), CSV_TO_POINTS)?;

        let addr = find_available_port().await?;

        let bootstrapper = SessionBootstrapper::new(
            SessionConfig::new()
                .with_workspace_root(temp_dir.path().join("workspace"))
                .with_pool_size(3),
        )
        .with_factories(factories);

        let state = AppState::new(
            ServerConfig::new().with_bind_address(addr),
            ProcessRegistry::standard(&[], &[scripts])?,
            engine,
            SessionManager::new(bootstrapper),
        );

        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Root under which session workspaces are created.
    pub fn workspace_root(&self) -> PathBuf {
        self.temp_dir.path().join("workspace")
    }

    /// `file:` identifier of the bundled script.
    pub fn script_identifier(&self) -> String {
        let path = self.temp_dir.path().join("scripts").join("csv_to_points.toml");
        ScriptResolver::identifier_for(&path).unwrap_or_default()
    }

    /// GET request builder for a path.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// GET request builder with a session token.
    pub fn get_as(&self, token: &str, path: &str) -> reqwest::RequestBuilder {
        self.get(path).header(SESSION_TOKEN_HEADER, token)
    }

    /// `GET /wps` with the given query pairs.
    pub fn wps(&self, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.get("/wps").query(query)
    }

    /// `GET /wps/execute` with the given query pairs.
    pub fn execute(&self, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.get("/wps/execute").query(query)
    }

    /// Names of the session workspaces created so far.
    pub fn workspaces(&self) -> Vec<String> {
        match std::fs::read_dir(self.workspace_root()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Check if server is healthy.
    pub async fn health(&self) -> Result<bool> {
        let resp = self.get("/health").send().await?;
        Ok(resp.status().is_success())
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
