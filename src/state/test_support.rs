use std::{sync::Arc, time::Duration};

use axum::extract::ws::Message;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{AppState, SharedState, registry::ConnectionId};
use crate::{
    auth::{Actor, JwtIdentityVerifier},
    config::AppConfig,
    dao::match_store::{
        StoreSlot,
        memory::{InMemoryMatchStore, MatchStoreSeed},
    },
};

pub const SECRET: &str = "unit-test-secret";

pub fn actor(id: &str) -> Actor {
    Actor {
        id: id.into(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
        sport: None,
    }
}

/// coach1 coaches t1, coach2 coaches t2; m1 is t1 vs t2 (upcoming), m2 is completed.
pub fn seeded_store() -> InMemoryMatchStore {
    let seed: MatchStoreSeed = serde_json::from_value(json!({
        "users": [
            { "id": "coach1", "email": "coach1@example.com", "name": "Coach One" },
            { "id": "coach2", "email": "coach2@example.com", "name": "Coach Two" },
            { "id": "outsider", "email": "outsider@example.com", "name": "Out Sider" }
        ],
        "teams": [
            { "id": "t1", "name": "Home FC", "coach_id": "coach1" },
            { "id": "t2", "name": "Away FC", "coach_id": "coach2" }
        ],
        "matches": [
            { "id": "m1", "home_team_id": "t1", "away_team_id": "t2" },
            { "id": "m2", "home_team_id": "t1", "away_team_id": "t2", "status": "completed" }
        ]
    }))
    .unwrap();
    InMemoryMatchStore::from_seed(seed)
}

pub async fn seeded_state() -> (SharedState, InMemoryMatchStore) {
    let store = seeded_store();
    let slot = StoreSlot::default();
    let identity = Arc::new(JwtIdentityVerifier::new(SECRET.as_bytes(), slot.clone()));
    let config = AppConfig::default()
        .with_jwt_secret(SECRET)
        .with_storage_timeout(Duration::from_millis(500));
    let state = AppState::new(config, identity, slot);
    state.install_match_store(Arc::new(store.clone())).await;
    (state, store)
}

/// Register a connection for `user_id` as the websocket service would.
pub fn connect(
    state: &AppState,
    user_id: &str,
) -> (ConnectionId, Actor, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::new_v4();
    let mut actor = actor(user_id);
    actor.name = match user_id {
        "coach1" => "Coach One".into(),
        "coach2" => "Coach Two".into(),
        _ => actor.name,
    };
    state.registry().register(id, actor.clone(), tx);
    (id, actor, rx)
}

/// Decode every frame currently queued on `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(Message::Text(text)) = rx.try_recv() {
        frames.push(serde_json::from_str(text.as_str()).unwrap());
    }
    frames
}
