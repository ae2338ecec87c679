//! Single fan-out point shared by the socket path and the REST ingress.

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    dto::ws::{MatchUpdatedPayload, NotificationPayload, ServerMessage, now_timestamp},
    state::{AppState, registry::ConnectionId},
};

/// `updatedBy` used when an external writer does not name itself.
pub const SYSTEM_ACTOR: &str = "system";

/// Deliver `message` to every current member of the match topic.
pub fn publish(state: &AppState, match_id: &str, message: &ServerMessage) -> usize {
    publish_filtered(state, match_id, message, None)
}

/// Deliver `message` to every current member of the match topic except `exclude`.
pub fn publish_except(
    state: &AppState,
    match_id: &str,
    message: &ServerMessage,
    exclude: ConnectionId,
) -> usize {
    publish_filtered(state, match_id, message, Some(exclude))
}

fn publish_filtered(
    state: &AppState,
    match_id: &str,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) -> usize {
    let Some(frame) = message.to_frame() else {
        return 0;
    };
    let delivered = state.topics().publish(match_id, &frame, exclude);
    debug!(match_id, delivered, "published topic event");
    delivered
}

/// Deliver `message` to a single connection.
pub fn send_to_connection(state: &AppState, connection_id: ConnectionId, message: &ServerMessage) -> bool {
    message
        .to_frame()
        .is_some_and(|frame| state.registry().send_to(connection_id, frame))
}

/// Deliver `message` to every live connection of `user_id`.
pub fn notify_actor(state: &AppState, user_id: &str, message: &ServerMessage) -> usize {
    let Some(frame) = message.to_frame() else {
        return 0;
    };
    state
        .registry()
        .senders_for_actor(user_id)
        .into_iter()
        .filter(|tx| tx.send(frame.clone()).is_ok())
        .count()
}

/// Publish an update produced outside the real-time path as a regular `match-updated` event.
pub fn broadcast_match_update(
    state: &AppState,
    match_id: &str,
    update_type: String,
    update_data: Value,
    updated_by: Option<String>,
) -> usize {
    let message = ServerMessage::MatchUpdated(MatchUpdatedPayload {
        match_id: match_id.to_owned(),
        update_type,
        update_data,
        updated_by: updated_by.unwrap_or_else(|| SYSTEM_ACTOR.to_owned()),
        timestamp: now_timestamp(),
    });
    let delivered = publish(state, match_id, &message);
    info!(match_id, delivered, "external match update broadcast");
    delivered
}

/// Send a private notification to every live connection of `user_id`.
pub fn notify_user(
    state: &AppState,
    user_id: &str,
    title: String,
    body: String,
    data: Option<Value>,
) -> usize {
    let message = ServerMessage::Notification(NotificationPayload {
        title,
        body,
        data,
        timestamp: now_timestamp(),
    });
    let delivered = notify_actor(state, user_id, &message);
    info!(user_id, delivered, "notification sent");
    delivered
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::test_support::{connect, drain, seeded_state};

    #[tokio::test]
    async fn external_update_reaches_topic_members_only() {
        let (state, _store) = seeded_state().await;
        let (c1, _, mut rx1) = connect(&state, "coach1");
        let (_c2, _, mut rx2) = connect(&state, "coach2");
        state.registry().join_topic(c1, "m1", None);

        let delivered = broadcast_match_update(
            &state,
            "m1",
            "created".into(),
            json!({ "venue": "North Park" }),
            None,
        );

        assert_eq!(delivered, 1);
        let frames = drain(&mut rx1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "match-updated");
        assert_eq!(frames[0]["data"]["matchId"], "m1");
        assert_eq!(frames[0]["data"]["updateType"], "created");
        assert_eq!(frames[0]["data"]["updatedBy"], SYSTEM_ACTOR);
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn notification_reaches_every_connection_of_the_user() {
        let (state, _store) = seeded_state().await;
        let (_a, _, mut rx_a) = connect(&state, "coach1");
        let (_b, _, mut rx_b) = connect(&state, "coach1");
        let (_c, _, mut rx_c) = connect(&state, "coach2");

        let delivered = notify_user(&state, "coach1", "Kick-off".into(), "Starting".into(), None);

        assert_eq!(delivered, 2);
        for rx in [&mut rx_a, &mut rx_b] {
            let frames = drain(rx);
            assert_eq!(frames[0]["event"], "notification");
            assert_eq!(frames[0]["data"]["title"], "Kick-off");
            assert!(frames[0]["data"]["timestamp"].is_string());
        }
        assert!(drain(&mut rx_c).is_empty());
    }

    #[tokio::test]
    async fn publish_to_empty_topic_is_a_no_op() {
        let (state, _store) = seeded_state().await;
        let delivered =
            broadcast_match_update(&state, "m1", "created".into(), json!({}), Some("admin".into()));
        assert_eq!(delivered, 0);
    }
}
