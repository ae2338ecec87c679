use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::ops::RealtimeStats, services::health_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/realtime/stats",
    tag = "health",
    responses((status = 200, description = "Live connection counters", body = RealtimeStats))
)]
/// Report live connections and subscriptions.
pub async fn realtime_stats(State(state): State<SharedState>) -> Json<RealtimeStats> {
    Json(health_service::realtime_stats(&state))
}

/// Configure the runtime counters route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/realtime/stats", get(realtime_stats))
}
