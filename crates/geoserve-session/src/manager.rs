//! Token-keyed session registry with one-shot background bootstrap.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use crate::bootstrap::SessionBootstrapper;
use crate::session::{Session, SessionToken};

type Slot = Arc<OnceCell<Arc<Session>>>;

/// Owns every session of the process.
///
/// Each token maps to a single [`OnceCell`]; whoever reaches it first runs
/// the bootstrap and every other caller awaits the same result.
#[derive(Clone)]
pub struct SessionManager {
    bootstrapper: Arc<SessionBootstrapper>,
    slots: Arc<RwLock<HashMap<SessionToken, Slot>>>,
}

impl SessionManager {
    pub fn new(bootstrapper: SessionBootstrapper) -> Self {
        Self {
            bootstrapper: Arc::new(bootstrapper),
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn bootstrapper(&self) -> &SessionBootstrapper {
        &self.bootstrapper
    }

    /// Start provisioning `token` in the background.
    ///
    /// Returns `true` when this call scheduled the bootstrap, `false` when
    /// the token was already known. Never waits for provisioning.
    pub async fn ensure(&self, token: SessionToken) -> bool {
        let (slot, created) = self.slot(token).await;
        if created {
            debug!(token = %token, "Scheduling session bootstrap");
            let bootstrapper = Arc::clone(&self.bootstrapper);
            tokio::spawn(async move {
                slot.get_or_init(|| async move { Arc::new(bootstrapper.bootstrap(token).await) })
                    .await;
            });
        }
        created
    }

    /// The session for `token`, awaiting (or running) its bootstrap.
    pub async fn session(&self, token: SessionToken) -> Arc<Session> {
        let (slot, _) = self.slot(token).await;
        let bootstrapper = Arc::clone(&self.bootstrapper);
        slot.get_or_init(|| async move { Arc::new(bootstrapper.bootstrap(token).await) })
            .await
            .clone()
    }

    /// The session for `token` if its bootstrap already completed.
    pub async fn get_ready(&self, token: SessionToken) -> Option<Arc<Session>> {
        let slots = self.slots.read().await;
        slots.get(&token)?.get().cloned()
    }

    /// Number of known tokens (bootstrapped or in progress).
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Cancel the worker pool of every bootstrapped session.
    pub async fn shutdown(&self) {
        let slots = self.slots.read().await;
        for session in slots.values().filter_map(|slot| slot.get()) {
            session.pool().cancel();
        }
        debug!(sessions = slots.len(), "Session manager shut down");
    }

    async fn slot(&self, token: SessionToken) -> (Slot, bool) {
        if let Some(slot) = self.slots.read().await.get(&token) {
            return (Arc::clone(slot), false);
        }

        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get(&token) {
            return (Arc::clone(slot), false);
        }
        let slot: Slot = Arc::new(OnceCell::new());
        slots.insert(token, Arc::clone(&slot));
        (slot, true)
    }
}
