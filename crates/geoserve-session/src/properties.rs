//! Property bag threaded through session bootstrap.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::datasource::Datasource;
use crate::error::{Result, ServiceError, SessionError};
use crate::pool::WorkerPool;

/// Key of the session workspace folder (`PathBuf`).
pub const WORKSPACE_FOLDER: &str = "workspace.folder";

/// Key of the session worker pool (`WorkerPool`).
pub const WORKER_POOL: &str = "executor.pool";

/// Key of the session datasource (`Datasource`). Absent when the database
/// could not be opened.
pub const DATA_SOURCE: &str = "data.source";

type PropertyValue = Arc<dyn Any + Send + Sync>;

/// String-keyed map of opaque values shared with every service factory.
///
/// Values are written once during bootstrap and only read afterwards.
#[derive(Clone, Default)]
pub struct PropertyBag {
    entries: HashMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under a key that must not be set yet.
    pub fn insert_once<T>(&mut self, key: impl Into<String>, value: T) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(SessionError::PropertyAlreadySet(key));
        }
        self.entries.insert(key, Arc::new(value));
        Ok(())
    }

    /// Get a value by key if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.as_ref().downcast_ref::<T>()
    }

    /// Get a value a service cannot work without.
    pub fn require<T: Any>(&self, key: &str, service: &str) -> std::result::Result<&T, ServiceError> {
        self.get::<T>(key)
            .ok_or_else(|| ServiceError::MissingDependency {
                service: service.to_string(),
                key: key.to_string(),
            })
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The session workspace folder.
    pub fn workspace_folder(&self) -> Option<&PathBuf> {
        self.get(WORKSPACE_FOLDER)
    }

    /// The session worker pool.
    pub fn worker_pool(&self) -> Option<&WorkerPool> {
        self.get(WORKER_POOL)
    }

    /// The session datasource.
    pub fn datasource(&self) -> Option<&Datasource> {
        self.get(DATA_SOURCE)
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("PropertyBag").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_typed() {
        let mut bag = PropertyBag::new();
        bag.insert_once(WORKSPACE_FOLDER, PathBuf::from("/tmp/ws")).unwrap();

        assert_eq!(bag.workspace_folder(), Some(&PathBuf::from("/tmp/ws")));
        assert!(bag.get::<String>(WORKSPACE_FOLDER).is_none());
        assert!(bag.worker_pool().is_none());
    }

    #[test]
    fn test_insert_once_rejects_second_write() {
        let mut bag = PropertyBag::new();
        bag.insert_once("k", 1u32).unwrap();
        let err = bag.insert_once("k", 2u32).unwrap_err();

        assert!(matches!(err, SessionError::PropertyAlreadySet(ref k) if k == "k"));
        assert_eq!(bag.get::<u32>("k"), Some(&1));
    }

    #[test]
    fn test_require_reports_missing_dependency() {
        let bag = PropertyBag::new();
        let err = bag.require::<Datasource>(DATA_SOURCE, "journal").unwrap_err();
        assert!(matches!(
            err,
            ServiceError::MissingDependency { ref service, ref key }
                if service == "journal" && key == DATA_SOURCE
        ));
    }

    #[test]
    fn test_clones_share_values() {
        let mut bag = PropertyBag::new();
        bag.insert_once("name", String::from("value")).unwrap();
        let copy = bag.clone();
        assert_eq!(copy.get::<String>("name").map(String::as_str), Some("value"));
        assert_eq!(copy.len(), 1);
    }
}
