use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    state::SharedState,
};

/// Backoff and polling knobs of the supervisor loop.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub health_interval: Duration,
    pub reconnect_attempts: u32,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            health_interval: Duration::from_secs(5),
            reconnect_attempts: 3,
        }
    }
}

impl SupervisorPolicy {
    fn next_delay(&self, delay: Duration) -> Duration {
        (delay * 2).min(self.max_delay)
    }
}

/// Keep a match store installed, polling its health and reconnecting with backoff.
///
/// While the backend is unreachable the shared state stays degraded and every
/// request needing storage fails fast with an unavailable error.
pub async fn run<F, Fut>(state: SharedState, connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    run_with_policy(state, connect, SupervisorPolicy::default()).await
}

/// [`run`] with explicit timings.
pub async fn run_with_policy<F, Fut>(state: SharedState, mut connect: F, policy: SupervisorPolicy)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut delay = policy.initial_delay;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_match_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = policy.initial_delay;

                watch_store(&state, store.as_ref(), &policy).await;

                warn!("exhausted storage reconnect attempts; dropping store handle");
                state.clear_match_store().await;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
            }
        }

        sleep(delay).await;
        delay = policy.next_delay(delay);
    }
}

/// Poll `store` until it fails and cannot be revived in place.
async fn watch_store(state: &SharedState, store: &dyn MatchStore, policy: &SupervisorPolicy) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
            }
            Err(err) => {
                warn!(backend = %err.backend(), error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true);
                if !reconnect(store, policy).await {
                    return;
                }
                info!("storage reconnection succeeded after health check failure");
                state.update_degraded(false);
            }
        }
        sleep(policy.health_interval).await;
    }
}

async fn reconnect(store: &dyn MatchStore, policy: &SupervisorPolicy) -> bool {
    let mut delay = policy.initial_delay;
    for attempt in 0..policy.reconnect_attempts {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::JwtIdentityVerifier,
        config::AppConfig,
        dao::match_store::{StoreSlot, memory::InMemoryMatchStore},
        state::{AppState, test_support::seeded_store},
    };

    fn fast_policy() -> SupervisorPolicy {
        SupervisorPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            health_interval: Duration::from_millis(5),
            reconnect_attempts: 2,
        }
    }

    fn empty_state() -> SharedState {
        let slot = StoreSlot::default();
        let identity = Arc::new(JwtIdentityVerifier::new(b"secret", slot.clone()));
        AppState::new(AppConfig::default(), identity, slot)
    }

    async fn wait_for(state: &SharedState, degraded: bool) {
        let mut watcher = state.degraded_watcher();
        tokio::time::timeout(Duration::from_secs(2), watcher.wait_for(|value| *value == degraded))
            .await
            .expect("degraded flag never changed")
            .unwrap();
    }

    #[tokio::test]
    async fn installs_store_and_tracks_outages() {
        let state = empty_state();
        assert!(state.is_degraded());

        let store = seeded_store();
        let handle = store.clone();
        let task = tokio::spawn(run_with_policy(
            state.clone(),
            move || {
                let store: Arc<dyn MatchStore> = Arc::new(handle.clone());
                async move { Ok::<_, StorageError>(store) }
            },
            fast_policy(),
        ));

        wait_for(&state, false).await;
        assert!(state.match_store().await.is_some());

        store.set_offline(true);
        wait_for(&state, true).await;

        store.set_offline(false);
        wait_for(&state, false).await;

        task.abort();
    }

    #[tokio::test]
    async fn stays_degraded_while_connect_fails() {
        let state = empty_state();
        let task = tokio::spawn(run_with_policy(
            state.clone(),
            || async {
                let store = InMemoryMatchStore::default();
                store.set_offline(true);
                Err::<Arc<dyn MatchStore>, _>(store.health_check().await.unwrap_err())
            },
            fast_policy(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.is_degraded());
        assert!(state.match_store().await.is_none());
        task.abort();
    }
}
