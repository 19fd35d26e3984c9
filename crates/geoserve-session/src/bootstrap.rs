//! Session provisioning.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::datasource::Datasource;
use crate::pool::WorkerPool;
use crate::properties::{DATA_SOURCE, PropertyBag, WORKER_POOL, WORKSPACE_FOLDER};
use crate::service::{Service, ServiceFactoryRegistry};
use crate::session::{Session, SessionToken};

/// Builds a [`Session`] for a token.
///
/// Bootstrap never fails as a whole. Each step that cannot complete is
/// logged and its resource is left absent; consumers discover the gap the
/// first time they depend on it.
pub struct SessionBootstrapper {
    config: SessionConfig,
    factories: ServiceFactoryRegistry,
}

impl SessionBootstrapper {
    /// Create a bootstrapper with no service factories.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            factories: ServiceFactoryRegistry::new(),
        }
    }

    /// Set the service factories invoked for every session.
    pub fn with_factories(mut self, factories: ServiceFactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn factories(&self) -> &ServiceFactoryRegistry {
        &self.factories
    }

    /// Provision the sandbox for `token`.
    pub async fn bootstrap(&self, token: SessionToken) -> Session {
        let workspace = self.config.workspace_root.join(token.to_string());
        let mut properties = PropertyBag::new();

        if let Err(e) = tokio::fs::create_dir_all(&workspace).await {
            error!(token = %token, path = %workspace.display(), error = %e, "Failed to create session workspace");
        }
        inject(&mut properties, WORKSPACE_FOLDER, workspace.clone());

        let pool = WorkerPool::new(self.config.pool_size);
        inject(&mut properties, WORKER_POOL, pool.clone());

        let datasource = open_datasource(&workspace.join(&self.config.database_file)).await;
        match &datasource {
            Some(ds) => inject(&mut properties, DATA_SOURCE, ds.clone()),
            None => warn!(token = %token, "Session has no datasource"),
        }

        let services = self.create_services(token, &properties).await;

        info!(
            token = %token,
            workspace = %workspace.display(),
            pool_size = pool.size(),
            datasource = datasource.is_some(),
            services = services.len(),
            "Session bootstrapped"
        );

        Session {
            token,
            workspace,
            pool,
            datasource,
            services,
            properties,
            created_at: Utc::now(),
        }
    }

    /// Run every factory on the blocking pool. Factories may touch the
    /// filesystem or the datasource.
    async fn create_services(&self, token: SessionToken, properties: &PropertyBag) -> Vec<Arc<dyn Service>> {
        let factories = self.factories.clone();
        let shared = properties.clone();
        let outcomes = match tokio::task::spawn_blocking(move || factories.create_all(&shared)).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                error!(token = %token, error = %e, "Service factories panicked");
                return Vec::new();
            }
        };

        let mut services = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.result {
                Ok(service) => {
                    info!(token = %token, factory = %outcome.factory, "Service started");
                    services.push(service);
                }
                Err(e) => {
                    error!(token = %token, factory = %outcome.factory, error = %e, "Service failed to start");
                }
            }
        }
        services
    }
}

fn inject<T>(properties: &mut PropertyBag, key: &str, value: T)
where
    T: std::any::Any + Send + Sync,
{
    if let Err(e) = properties.insert_once(key, value) {
        error!(key, error = %e, "Failed to inject bootstrap property");
    }
}

async fn open_datasource(path: &Path) -> Option<Datasource> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || Datasource::open(&owned)).await {
        Ok(Ok(ds)) => {
            debug!(path = %path.display(), "Opened session datasource");
            Some(ds)
        }
        Ok(Err(e)) => {
            error!(path = %path.display(), error = %e, "Failed to open session datasource");
            None
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Datasource initialisation panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::service::ServiceFactory;
    use std::any::Any;
    use tempfile::TempDir;

    struct Journal;

    impl Service for Journal {
        fn name(&self) -> &str {
            "journal"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct JournalFactory;

    impl ServiceFactory for JournalFactory {
        fn name(&self) -> &str {
            "journal"
        }

        fn create(&self, properties: &PropertyBag) -> Result<Arc<dyn Service>, ServiceError> {
            properties.require::<Datasource>(DATA_SOURCE, "journal")?;
            Ok(Arc::new(Journal))
        }
    }

    struct Standalone;

    impl Service for Standalone {
        fn name(&self) -> &str {
            "standalone"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct StandaloneFactory;

    impl ServiceFactory for StandaloneFactory {
        fn name(&self) -> &str {
            "standalone"
        }

        fn create(&self, properties: &PropertyBag) -> Result<Arc<dyn Service>, ServiceError> {
            assert!(properties.workspace_folder().is_some());
            assert!(properties.worker_pool().is_some());
            Ok(Arc::new(Standalone))
        }
    }

    struct SlowFactory;

    impl ServiceFactory for SlowFactory {
        fn name(&self) -> &str {
            "standalone"
        }

        fn create(&self, _: &PropertyBag) -> Result<Arc<dyn Service>, ServiceError> {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(Arc::new(Standalone))
        }
    }

    fn bootstrapper(root: &Path) -> SessionBootstrapper {
        SessionBootstrapper::new(SessionConfig::new().with_workspace_root(root).with_pool_size(3))
            .with_factories(
                ServiceFactoryRegistry::new()
                    .with_factory(JournalFactory)
                    .with_factory(StandaloneFactory),
            )
    }

    #[tokio::test]
    async fn test_bootstrap_provisions_everything() {
        let dir = TempDir::new().unwrap();
        let token = SessionToken::new();
        let session = bootstrapper(dir.path()).bootstrap(token).await;

        assert_eq!(session.workspace(), dir.path().join(token.to_string()));
        assert!(session.workspace().is_dir());
        assert!(session.workspace().join("session.db").is_file());
        assert_eq!(session.pool().size(), 3);
        assert!(session.datasource().unwrap().is_spatial().unwrap());
        assert_eq!(session.service_names(), vec!["journal", "standalone"]);
        assert!(session.properties().contains(DATA_SOURCE));
    }

    #[tokio::test]
    async fn test_datasource_failure_skips_dependents_only() {
        let dir = TempDir::new().unwrap();
        let token = SessionToken::new();
        // A directory where the database file should be makes the open fail.
        std::fs::create_dir_all(dir.path().join(token.to_string()).join("session.db")).unwrap();

        let session = bootstrapper(dir.path()).bootstrap(token).await;

        assert!(session.datasource().is_none());
        assert!(!session.properties().contains(DATA_SOURCE));
        assert!(session.service::<Journal>().is_none());
        assert!(session.service::<Standalone>().is_some());
        assert_eq!(session.pool().size(), 3);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_factory_leaves_runtime_free() {
        let dir = TempDir::new().unwrap();
        let bootstrapper = SessionBootstrapper::new(SessionConfig::new().with_workspace_root(dir.path()))
            .with_factories(ServiceFactoryRegistry::new().with_factory(SlowFactory));

        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
            })
        };

        let session = bootstrapper.bootstrap(SessionToken::new()).await;
        ticker.abort();

        assert!(session.service::<Standalone>().is_some());
        // A factory run inline would starve the single runtime thread.
        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) >= 5);
    }
}
