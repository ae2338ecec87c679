use tracing::warn;

use crate::{
    dto::ops::{HealthResponse, RealtimeStats},
    state::SharedState,
};

/// Respond with a static health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_match_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

/// Snapshot of live connection and subscription counters.
pub fn realtime_stats(state: &SharedState) -> RealtimeStats {
    let registry = state.registry();
    let topics = state.topics();
    RealtimeStats {
        connected_users: registry.connected_users(),
        active_connections: registry.connection_count(),
        active_matches: topics.active_topics(),
        total_subscriptions: topics.subscription_total(),
    }
}
