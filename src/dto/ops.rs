use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Storage reachable.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// No storage installed or the last health check failed.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}

/// Live connection counters returned by `/realtime/stats`.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    /// Distinct users with at least one live connection.
    pub connected_users: usize,
    /// Live connections.
    pub active_connections: usize,
    /// Matches with at least one subscriber.
    pub active_matches: usize,
    /// Memberships summed over every match.
    pub total_subscriptions: usize,
}
