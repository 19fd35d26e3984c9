//! HTTP server for geoserve.
//!
//! Exposes the WPS 2.0 operations (GetCapabilities, DescribeProcess,
//! Execute) over plain GET requests with JSON response documents.
//!
//! # Routes
//!
//! - `GET /health`
//! - `GET /wps?service=wps&version=2.0.0&request=...`
//! - `GET /wps/execute?identifier=...&responseFormat=...&mode=...`
//! - `GET /jobs/{id}`
//!
//! Every route runs behind the session middleware, which binds the request
//! to a session token (see [`session`]). Sessions are provisioned by the
//! WPS handlers after validation, never by the middleware.
//!
//! # Example
//!
//! ```ignore
//! use geoserve_server::{AppState, Server, ServerConfig};
//!
//! let state = AppState::new(config, registry, engine, sessions);
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod wps;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError, WpsError};
pub use session::{SESSION_TOKEN_HEADER, SessionBinding, session_middleware};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The geoserve HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::get;

        Router::new()
            .merge(routes::health_routes())
            .route("/wps", get(routes::wps_handler))
            .route("/wps/execute", get(routes::execute_handler))
            .route("/jobs/{id}", get(routes::get_job_handler))
            .layer(middleware::from_fn(session::session_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        let sessions = self.state.sessions.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)));

        sessions.shutdown().await;
        info!("Server stopped");
        result
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
