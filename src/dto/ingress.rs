use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /ingress/matches/{matchId}/broadcast`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchBroadcastRequest {
    /// Tag forwarded as `updateType`.
    #[validate(length(min = 1, max = 64))]
    pub update_type: String,
    /// Payload forwarded as `updateData`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub update_data: Value,
    /// Name shown as `updatedBy`; defaults to `system`.
    #[validate(length(min = 1, max = 128))]
    pub updated_by: Option<String>,
}

/// Body of `POST /ingress/users/{userId}/notifications`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NotificationRequest {
    /// Short title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Notification text.
    #[validate(length(max = 2000))]
    pub body: String,
    /// Optional structured data.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

/// Response of both ingress routes.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DeliveryResponse {
    /// Number of connections the event was queued to.
    pub delivered: usize,
}
