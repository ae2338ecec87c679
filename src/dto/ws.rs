//! Frames exchanged on `/ws`, all shaped as `{ "event": <name>, "data": <payload> }`.

use std::time::SystemTime;

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{format_system_time, validation::validate_identifier};
use crate::{
    auth::Actor,
    dao::models::{ChatMessageEntity, MatchChangeEntity, ScoreEntity, TimelineEntryEntity},
    error::{ErrorKind, ServiceError},
    state::{match_status::MatchStatus, mutation::MatchMutationEvent, registry::ConnectionId},
};

/// Requests accepted from real-time clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientRequest {
    /// Join a match topic.
    SubscribeMatch(MatchRef),
    /// Leave a match topic.
    UnsubscribeMatch(MatchRef),
    /// Submit a score, timeline or status change.
    MatchUpdate(MatchUpdateRequest),
    /// Send a chat message to a match topic.
    ChatMessage(ChatMessageRequest),
    /// Announce that the sender started typing.
    TypingStart(MatchRef),
    /// Announce that the sender stopped typing.
    TypingStop(MatchRef),
}

impl ClientRequest {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, ServiceError> {
        let request: Self = serde_json::from_str(text)
            .map_err(|err| ServiceError::InvalidRequest(err.to_string()))?;
        match &request {
            Self::SubscribeMatch(data)
            | Self::UnsubscribeMatch(data)
            | Self::TypingStart(data)
            | Self::TypingStop(data) => data.validate()?,
            Self::MatchUpdate(data) => data.validate()?,
            Self::ChatMessage(data) => data.validate()?,
        }
        Ok(request)
    }

    /// Wire name of the request, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SubscribeMatch(_) => "subscribe-match",
            Self::UnsubscribeMatch(_) => "unsubscribe-match",
            Self::MatchUpdate(_) => "match-update",
            Self::ChatMessage(_) => "chat-message",
            Self::TypingStart(_) => "typing-start",
            Self::TypingStop(_) => "typing-stop",
        }
    }

    /// Match the request targets.
    pub fn match_id(&self) -> &str {
        match self {
            Self::SubscribeMatch(data)
            | Self::UnsubscribeMatch(data)
            | Self::TypingStart(data)
            | Self::TypingStop(data) => &data.match_id,
            Self::MatchUpdate(data) => &data.match_id,
            Self::ChatMessage(data) => &data.match_id,
        }
    }
}

/// Payload naming a single match.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchRef {
    /// Target match.
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
}

/// Payload of `match-update`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpdateRequest {
    /// Target match.
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    /// `score`, `event` or `status`.
    pub update_type: String,
    /// Payload specific to `update_type`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub update_data: Value,
}

/// Payload of `chat-message`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    /// Target match.
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    /// Message body.
    pub message: String,
}

/// Events pushed to real-time clients.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Handshake accepted.
    Connected(ConnectedPayload),
    /// Snapshot sent to a connection right after it joins a match.
    MatchState(MatchSnapshot),
    /// Accepted mutation or externally published update.
    MatchUpdated(MatchUpdatedPayload),
    /// Persisted chat message.
    NewMessage(ChatMessagePayload),
    /// A participant started typing.
    UserTyping(TypingPayload),
    /// A participant stopped typing.
    UserStoppedTyping(TypingPayload),
    /// Private notification for one user.
    Notification(NotificationPayload),
    /// Failure of the connection's own request.
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Serialize into a text frame; serialization failures are logged and dropped.
    pub fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(payload) => Some(Message::Text(payload.into())),
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound event `{self:?}`");
                None
            }
        }
    }

    /// Error event for a failed request.
    pub fn error(err: &ServiceError) -> Self {
        Self::Error(ErrorPayload {
            message: err.client_message(),
            kind: err.kind(),
        })
    }
}

/// Payload of `connected`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    /// Identifier assigned to this connection.
    pub connection_id: Uuid,
    /// Authenticated user.
    pub user_id: String,
    /// Display name of the authenticated user.
    pub user_name: String,
}

impl ConnectedPayload {
    /// Build from the connection id and its actor.
    pub fn new(connection_id: ConnectionId, actor: &Actor) -> Self {
        Self {
            connection_id,
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
        }
    }
}

/// Timeline entry as sent to clients.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntryView {
    /// Server-assigned identifier.
    pub id: String,
    /// Entry kind, e.g. `goal`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Match minute.
    pub minute: Option<u16>,
    /// Team involved.
    pub team_id: Option<String>,
    /// Player involved.
    pub player_id: Option<String>,
    /// Free-text detail.
    pub description: Option<String>,
    /// User who recorded the entry.
    pub added_by: String,
    /// RFC 3339 time the entry was recorded.
    pub timestamp: String,
}

impl From<&TimelineEntryEntity> for TimelineEntryView {
    fn from(entry: &TimelineEntryEntity) -> Self {
        Self {
            id: entry.id.clone(),
            kind: entry.kind.as_str().to_owned(),
            minute: entry.minute,
            team_id: entry.team_id.clone(),
            player_id: entry.player_id.clone(),
            description: entry.description.clone(),
            added_by: entry.added_by.clone(),
            timestamp: format_system_time(entry.timestamp),
        }
    }
}

/// Point-in-time view of a match delivered with `match-state`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    /// Match identifier.
    pub id: String,
    /// Home team identifier.
    pub home_team_id: String,
    /// Away team identifier.
    pub away_team_id: String,
    /// Home team display name.
    pub home_team_name: Option<String>,
    /// Away team display name.
    pub away_team_name: Option<String>,
    /// Current status.
    pub status: MatchStatus,
    /// Current score.
    pub score: ScoreEntity,
    /// Timeline in insertion order.
    pub timeline: Vec<TimelineEntryView>,
    /// Venue, when known.
    pub venue: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

/// Payload of `match-updated`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpdatedPayload {
    /// Match the update belongs to.
    pub match_id: String,
    /// `score`, `event`, `status` or an externally supplied tag.
    pub update_type: String,
    /// Update payload.
    #[schema(value_type = Object)]
    pub update_data: Value,
    /// Display name of whoever made the change.
    pub updated_by: String,
    /// RFC 3339 time of the change.
    pub timestamp: String,
}

impl From<&MatchMutationEvent> for MatchUpdatedPayload {
    fn from(event: &MatchMutationEvent) -> Self {
        let update_data = match &event.change {
            MatchChangeEntity::Score(score) => serde_json::to_value(score),
            MatchChangeEntity::TimelineEvent(entry) => {
                serde_json::to_value(TimelineEntryView::from(entry))
            }
            MatchChangeEntity::Status { from, to } => serde_json::to_value(StatusChangeView {
                status: *to,
                previous_status: *from,
            }),
        }
        .unwrap_or_default();

        Self {
            match_id: event.match_id.clone(),
            update_type: event.update_type().to_owned(),
            update_data,
            updated_by: event.updated_by.clone(),
            timestamp: format_system_time(event.timestamp),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusChangeView {
    status: MatchStatus,
    previous_status: MatchStatus,
}

/// Payload of `new-message`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    /// Server-assigned message id.
    pub id: String,
    /// Match the message was sent to.
    pub match_id: String,
    /// Message body.
    pub content: String,
    /// Sender display name.
    pub user_name: String,
    /// Sender identifier.
    pub user_id: String,
    /// RFC 3339 time assigned by the store.
    pub timestamp: String,
}

impl ChatMessagePayload {
    /// Build from a persisted message and its sender.
    pub fn new(message: &ChatMessageEntity, sender: &Actor) -> Self {
        Self {
            id: message.id.clone(),
            match_id: message.match_id.clone(),
            content: message.content.clone(),
            user_name: sender.name.clone(),
            user_id: message.user_id.clone(),
            timestamp: format_system_time(message.timestamp),
        }
    }
}

/// Payload of `user-typing` and `user-stopped-typing`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Match the indicator applies to.
    pub match_id: String,
    /// Typing user.
    pub user_id: String,
    /// Typing user's display name.
    pub user_name: String,
}

/// Payload of `notification`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationPayload {
    /// Short title.
    pub title: String,
    /// Notification text.
    pub body: String,
    /// Optional structured data.
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    /// RFC 3339 time the notification was sent.
    pub timestamp: String,
}

/// Payload of `error`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorPayload {
    /// Description of the failure.
    pub message: String,
    /// Failure class.
    pub kind: ErrorKind,
}

/// Current time formatted for outbound payloads.
pub fn now_timestamp() -> String {
    format_system_time(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::models::TimelineEventKind;

    #[test]
    fn parses_subscribe_request() {
        let request =
            ClientRequest::from_json_str(r#"{"event":"subscribe-match","data":{"matchId":"m1"}}"#)
                .unwrap();
        assert!(matches!(&request, ClientRequest::SubscribeMatch(r) if r.match_id == "m1"));
        assert_eq!(request.event_name(), "subscribe-match");
    }

    #[test]
    fn parses_match_update_with_raw_payload() {
        let request = ClientRequest::from_json_str(
            r#"{"event":"match-update","data":{"matchId":"m1","updateType":"score","updateData":{"home":2,"away":1}}}"#,
        )
        .unwrap();
        let ClientRequest::MatchUpdate(update) = request else {
            panic!("expected match-update");
        };
        assert_eq!(update.update_type, "score");
        assert_eq!(update.update_data, json!({ "home": 2, "away": 1 }));
    }

    #[test]
    fn unknown_event_is_invalid_request() {
        let err = ClientRequest::from_json_str(r#"{"event":"dance","data":{}}"#).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[test]
    fn blank_match_id_is_invalid_request() {
        let err = ClientRequest::from_json_str(r#"{"event":"typing-start","data":{"matchId":""}}"#)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[test]
    fn server_message_uses_event_envelope() {
        let frame = ServerMessage::UserTyping(TypingPayload {
            match_id: "m1".into(),
            user_id: "coach1".into(),
            user_name: "Coach One".into(),
        });
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["event"], "user-typing");
        assert_eq!(value["data"]["userName"], "Coach One");
    }

    #[test]
    fn error_event_carries_kind() {
        let frame = ServerMessage::error(&ServiceError::PermissionDenied("no".into()));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["kind"], "permission_denied");
    }

    #[test]
    fn match_updated_renders_timeline_entries() {
        let event = MatchMutationEvent {
            match_id: "m1".into(),
            change: MatchChangeEntity::TimelineEvent(TimelineEntryEntity {
                id: "e1".into(),
                kind: TimelineEventKind::Goal,
                minute: Some(9),
                team_id: Some("t1".into()),
                player_id: None,
                description: None,
                added_by: "coach1".into(),
                timestamp: SystemTime::UNIX_EPOCH,
            }),
            updated_by: "Coach One".into(),
            timestamp: SystemTime::UNIX_EPOCH,
        };

        let payload = MatchUpdatedPayload::from(&event);
        assert_eq!(payload.update_type, "event");
        assert_eq!(payload.update_data["type"], "goal");
        assert_eq!(payload.update_data["teamId"], "t1");
        assert!(payload.update_data.get("playerId").is_none());
        assert_eq!(payload.timestamp, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn match_updated_renders_status_change() {
        let event = MatchMutationEvent {
            match_id: "m1".into(),
            change: MatchChangeEntity::Status {
                from: MatchStatus::Upcoming,
                to: MatchStatus::Ongoing,
            },
            updated_by: "Coach One".into(),
            timestamp: SystemTime::UNIX_EPOCH,
        };
        let payload = MatchUpdatedPayload::from(&event);
        assert_eq!(
            payload.update_data,
            json!({ "status": "ongoing", "previousStatus": "upcoming" })
        );
    }
}
