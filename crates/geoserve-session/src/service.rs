//! Pluggable session services and the factories that build them.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::properties::PropertyBag;

/// A service attached to a session.
pub trait Service: Send + Sync + 'static {
    /// Short service name (used in logs).
    fn name(&self) -> &str;

    /// Downcast hook so consumers can fetch a concrete service.
    fn as_any(&self) -> &dyn Any;
}

/// Builds one kind of service from the bootstrap properties.
///
/// A factory must tolerate missing optional properties and return
/// [`ServiceError::MissingDependency`] only for its own mandatory ones.
pub trait ServiceFactory: Send + Sync {
    /// Factory name (used in logs).
    fn name(&self) -> &str;

    /// Create the service.
    fn create(&self, properties: &PropertyBag) -> Result<Arc<dyn Service>, ServiceError>;
}

/// Result of running one factory during bootstrap.
pub struct FactoryOutcome {
    /// Name of the factory that produced this outcome.
    pub factory: String,
    /// The created service, or why it could not be created.
    pub result: Result<Arc<dyn Service>, ServiceError>,
}

/// Ordered set of service factories.
#[derive(Clone, Default)]
pub struct ServiceFactoryRegistry {
    factories: Vec<Arc<dyn ServiceFactory>>,
}

impl ServiceFactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory.
    pub fn register(&mut self, factory: impl ServiceFactory + 'static) {
        self.factories.push(Arc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_factory(mut self, factory: impl ServiceFactory + 'static) -> Self {
        self.register(factory);
        self
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Factory names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Run every factory in order, one outcome per factory.
    ///
    /// A failing or panicking factory does not stop the ones after it.
    pub fn create_all(&self, properties: &PropertyBag) -> Vec<FactoryOutcome> {
        self.factories
            .iter()
            .map(|factory| {
                let name = factory.name().to_string();
                let result = catch_unwind(AssertUnwindSafe(|| factory.create(properties)))
                    .unwrap_or_else(|payload| {
                        Err(ServiceError::Panicked(name.clone(), panic_message(&payload)))
                    });
                FactoryOutcome {
                    factory: name,
                    result,
                }
            })
            .collect()
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
