//! Session identity and the provisioned sandbox.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datasource::Datasource;
use crate::error::{Result, SessionError};
use crate::pool::WorkerPool;
use crate::properties::PropertyBag;
use crate::service::Service;

/// Opaque client session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Mint a fresh random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A provisioned client sandbox. Immutable once built.
pub struct Session {
    pub(crate) token: SessionToken,
    pub(crate) workspace: PathBuf,
    pub(crate) pool: WorkerPool,
    pub(crate) datasource: Option<Datasource>,
    pub(crate) services: Vec<Arc<dyn Service>>,
    pub(crate) properties: PropertyBag,
    pub(crate) created_at: DateTime<Utc>,
}

impl Session {
    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The session database, if it could be opened during bootstrap.
    pub fn datasource(&self) -> Option<&Datasource> {
        self.datasource.as_ref()
    }

    /// The session database, or an error naming the session when absent.
    pub fn require_datasource(&self) -> Result<&Datasource> {
        self.datasource
            .as_ref()
            .ok_or_else(|| SessionError::DatasourceUnavailable(self.token.to_string()))
    }

    /// Active services in factory registration order.
    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// First active service of concrete type `T`.
    pub fn service<T: Service>(&self) -> Option<&T> {
        self.services
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Properties the factories were given.
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("workspace", &self.workspace)
            .field("pool", &self.pool)
            .field("datasource", &self.datasource.as_ref().map(|d| d.path()))
            .field("services", &self.service_names())
            .field("created_at", &self.created_at)
            .finish()
    }
}
