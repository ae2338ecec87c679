pub mod connection;
pub mod gates;
pub mod match_status;
pub mod mutation;
pub mod registry;
#[cfg(test)]
pub(crate) mod test_support;
pub mod topics;

use std::{future::Future, sync::Arc};

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::warn;

use crate::{
    auth::IdentityVerifier,
    config::AppConfig,
    dao::{
        match_store::{MatchStore, StoreSlot},
        storage::StorageResult,
    },
    error::ServiceError,
};

use self::{gates::MatchGates, registry::ConnectionRegistry, topics::TopicGroups};

pub type SharedState = Arc<AppState>;

/// Central application state storing live connections, topic groups and the storage handle.
pub struct AppState {
    config: Arc<AppConfig>,
    store: StoreSlot,
    degraded: watch::Sender<bool>,
    identity: Arc<dyn IdentityVerifier>,
    registry: ConnectionRegistry,
    gates: MatchGates,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed in `store`.
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityVerifier>,
        store: StoreSlot,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config: Arc::new(config),
            store,
            degraded: degraded_tx,
            identity,
            registry: ConnectionRegistry::default(),
            gates: MatchGates::default(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Verifier used by the handshake.
    pub fn identity(&self) -> Arc<dyn IdentityVerifier> {
        self.identity.clone()
    }

    /// Registry of live connections.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Per-match multicast groups.
    pub fn topics(&self) -> &TopicGroups {
        self.registry.topics()
    }

    /// Per-match gates serialising mutations and joins.
    pub fn gates(&self) -> &MatchGates {
        &self.gates
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        self.store.current().await
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_match_store(&self, store: Arc<dyn MatchStore>) {
        self.store.install(store).await;
        self.update_degraded(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        self.store.clear().await;
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Return the match store or a degraded error when none is installed.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Run one store call bounded by the configured storage timeout.
    ///
    /// A timed-out write may still commit on the server; the caller only
    /// knows that nothing was broadcast.
    pub async fn run_storage<T, F, Fut>(&self, op: F) -> Result<T, ServiceError>
    where
        F: FnOnce(Arc<dyn MatchStore>) -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let store = self.require_match_store().await?;
        let limit = self.config.storage_timeout();
        match timeout(limit, op(store)).await {
            Ok(result) => result.map_err(|err| {
                warn!(backend = %err.backend(), error = %err, "storage call failed");
                ServiceError::from(err)
            }),
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "storage call timed out");
                Err(ServiceError::Timeout)
            }
        }
    }
}
