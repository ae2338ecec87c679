use tracing::{debug, info};

use crate::{
    auth::{Actor, access},
    dao::models::{ChatMessageEntity, NewChatMessage},
    dto::ws::{ChatMessagePayload, ServerMessage, TypingPayload},
    error::ServiceError,
    services::broadcast,
    state::{AppState, registry::ConnectionId},
};

/// Persist a chat message and publish it to the match topic, sender included.
pub async fn send_message(
    state: &AppState,
    connection_id: ConnectionId,
    actor: &Actor,
    match_id: &str,
    body: &str,
) -> Result<ChatMessageEntity, ServiceError> {
    let content = body.trim();
    if content.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "message must not be empty".into(),
        ));
    }
    let max_length = state.config().chat_max_length();
    if content.chars().count() > max_length {
        return Err(ServiceError::InvalidRequest(format!(
            "message exceeds {max_length} characters"
        )));
    }

    access::ensure_can_access(state, &actor.id, match_id).await?;

    let message = NewChatMessage {
        match_id: match_id.to_owned(),
        user_id: actor.id.clone(),
        content: content.to_owned(),
    };
    let stored = state
        .run_storage(|store| store.save_chat_message(message))
        .await?;

    let event = ServerMessage::NewMessage(ChatMessagePayload::new(&stored, actor));
    let mut delivered = broadcast::publish(state, match_id, &event);
    // Echo to a sender that has not joined the topic.
    if !state.registry().is_subscribed(connection_id, match_id)
        && broadcast::send_to_connection(state, connection_id, &event)
    {
        delivered += 1;
    }

    info!(
        user_id = %actor.id,
        match_id,
        message_id = %stored.id,
        delivered,
        "chat message relayed"
    );
    Ok(stored)
}

/// Relay a typing indicator to the other members of the topic; nothing is stored.
pub fn set_typing(
    state: &AppState,
    connection_id: ConnectionId,
    actor: &Actor,
    match_id: &str,
    typing: bool,
) -> Result<usize, ServiceError> {
    if !state.registry().is_subscribed(connection_id, match_id) {
        return Err(ServiceError::PermissionDenied(format!(
            "subscribe to match `{match_id}` first"
        )));
    }

    let payload = TypingPayload {
        match_id: match_id.to_owned(),
        user_id: actor.id.clone(),
        user_name: actor.name.clone(),
    };
    let event = if typing {
        ServerMessage::UserTyping(payload)
    } else {
        ServerMessage::UserStoppedTyping(payload)
    };

    let delivered = broadcast::publish_except(state, match_id, &event, connection_id);
    debug!(user_id = %actor.id, match_id, typing, delivered, "typing indicator relayed");
    Ok(delivered)
}
