use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderMap, header::AUTHORIZATION},
    response::Response,
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    services::{handshake_service, websocket_service},
    state::SharedState,
};

/// Query string accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    /// Bearer credential for clients that cannot set headers.
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "realtime",
    params(
        ("Authorization" = Option<String>, Header, description = "`Bearer <token>`"),
        ("token" = Option<String>, Query, description = "Bearer token when headers cannot be set"),
    ),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 401, description = "Credential missing or rejected", body = crate::error::ErrorBody),
        (status = 503, description = "User store unavailable", body = crate::error::ErrorBody),
    )
)]
/// Authenticate the caller, then upgrade the HTTP connection into a match session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<HandshakeQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let credential = bearer_token(&headers).or(query.token);
    let session = handshake_service::authenticate(&state, credential).await?;

    let shared_state = state.clone();
    Ok(ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(shared_state, socket, session)
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
