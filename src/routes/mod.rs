use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod ingress;
pub mod stats;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(stats::router())
        .merge(websocket::router())
        .merge(ingress::router(state.clone()))
        .merge(docs::router());

    api_router.with_state(state)
}
