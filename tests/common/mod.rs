#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use futures::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::{net::TcpListener, task::JoinHandle, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, client::IntoClientRequest, http::HeaderValue},
};

use match_sync::{
    auth::{JwtIdentityVerifier, identity::CredentialClaims},
    config::AppConfig,
    dao::match_store::{
        StoreSlot,
        memory::{InMemoryMatchStore, MatchStoreSeed},
    },
    routes,
    state::{AppState, SharedState},
};

pub const SECRET: &str = "integration-secret";
pub const INGRESS_TOKEN: &str = "integration-ingress";

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

pub type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// coach1 coaches t1, coach2 coaches t2, outsider coaches nothing.
/// m1 is t1 vs t2 (upcoming), m2 is t1 vs t2 (completed).
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

pub fn test_state() -> (SharedState, StoreSlot) {
    let slot = StoreSlot::default();
    let identity = Arc::new(JwtIdentityVerifier::new(SECRET.as_bytes(), slot.clone()));
    let config = AppConfig::default()
        .with_jwt_secret(SECRET)
        .with_ingress_token(INGRESS_TOKEN)
        .with_storage_timeout(Duration::from_millis(500));
    (AppState::new(config, identity, slot.clone()), slot)
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: SharedState,
    pub store: InMemoryMatchStore,
    task: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve the full router on an ephemeral port backed by the seeded in-memory store.
pub async fn spawn_server() -> TestServer {
    let store = seeded_store();
    let (state, _slot) = test_state();
    state.install_match_store(Arc::new(store.clone())).await;

    let app = routes::router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    TestServer {
        addr,
        state,
        store,
        task,
    }
}

pub fn token(user_id: &str) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        + 600;
    encode(
        &Header::default(),
        &CredentialClaims {
            user_id: user_id.into(),
            exp,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// Open a socket presenting `credential` as a bearer header.
pub async fn try_connect(
    addr: SocketAddr,
    credential: Option<&str>,
) -> Result<Client, tungstenite::Error> {
    let mut request = format!("ws://{addr}/ws").into_client_request()?;
    if let Some(credential) = credential {
        request.headers_mut().insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {credential}")).unwrap(),
        );
    }
    connect_async(request).await.map(|(stream, _)| stream)
}

/// Connect as `user_id` and consume the `connected` greeting.
pub async fn connect(server: &TestServer, user_id: &str) -> Client {
    let mut client = try_connect(server.addr, Some(&token(user_id)))
        .await
        .unwrap();
    let greeting = expect_event(&mut client, "connected").await;
    assert_eq!(greeting["userId"], user_id);
    client
}

pub async fn send(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame.into())).await.unwrap();
}

/// Next JSON event, skipping control frames.
pub async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = timeout(EVENT_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for event")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next event, asserting its name; returns its `data`.
pub async fn expect_event(client: &mut Client, name: &str) -> Value {
    let event = next_event(client).await;
    assert_eq!(event["event"], name, "unexpected event {event}");
    event["data"].clone()
}

/// Assert nothing but control frames arrive for a short window.
pub async fn expect_silence(client: &mut Client) {
    let result = timeout(SILENCE_WINDOW, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    if let Ok(Some(text)) = result {
        panic!("expected silence, got {text}");
    }
}

/// Subscribe to `match_id` and return the snapshot.
pub async fn subscribe(client: &mut Client, match_id: &str) -> Value {
    send(client, "subscribe-match", json!({ "matchId": match_id })).await;
    expect_event(client, "match-state").await
}

/// Poll until `check` holds or give up after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition never became true"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
