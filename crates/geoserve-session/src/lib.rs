//! Per-client session sandboxes.
//!
//! A session is provisioned lazily the first time a client token is seen:
//! - a workspace directory named after the token
//! - a bounded worker pool for process invocations
//! - a spatial-capable SQLite datasource inside the workspace
//! - every pluggable service produced by the registered factories
//!
//! Provisioning runs on a background task so that the request which
//! triggered it never waits for it. Consumers that do need the session
//! await [`SessionManager::session`].
//!
//! # Example
//!
//! ```rust,ignore
//! use geoserve_session::{SessionBootstrapper, SessionConfig, SessionManager, SessionToken};
//!
//! let bootstrapper = SessionBootstrapper::new(SessionConfig::default().with_pool_size(3));
//! let sessions = SessionManager::new(bootstrapper);
//!
//! let token = SessionToken::new();
//! sessions.ensure(token).await;          // fire-and-forget
//! let session = sessions.session(token).await; // awaits completion
//! ```

mod bootstrap;
mod config;
mod datasource;
mod error;
mod manager;
mod pool;
mod properties;
mod service;
mod session;

pub use bootstrap::SessionBootstrapper;
pub use config::SessionConfig;
pub use datasource::Datasource;
pub use error::{PoolError, Result, ServiceError, SessionError};
pub use manager::SessionManager;
pub use pool::WorkerPool;
pub use properties::{DATA_SOURCE, PropertyBag, WORKER_POOL, WORKSPACE_FOLDER};
pub use service::{FactoryOutcome, Service, ServiceFactory, ServiceFactoryRegistry};
pub use session::{Session, SessionToken};
