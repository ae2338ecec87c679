use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the match synchronisation service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::stats::realtime_stats,
        crate::routes::websocket::ws_handler,
        crate::routes::ingress::broadcast_match_update,
        crate::routes::ingress::notify_user,
    ),
    components(
        schemas(
            crate::dto::ops::HealthResponse,
            crate::dto::ops::RealtimeStats,
            crate::dto::ingress::MatchBroadcastRequest,
            crate::dto::ingress::NotificationRequest,
            crate::dto::ingress::DeliveryResponse,
            crate::dto::ws::MatchRef,
            crate::dto::ws::MatchUpdateRequest,
            crate::dto::ws::ChatMessageRequest,
            crate::dto::ws::ConnectedPayload,
            crate::dto::ws::MatchSnapshot,
            crate::dto::ws::TimelineEntryView,
            crate::dto::ws::MatchUpdatedPayload,
            crate::dto::ws::ChatMessagePayload,
            crate::dto::ws::TypingPayload,
            crate::dto::ws::NotificationPayload,
            crate::dto::ws::ErrorPayload,
            crate::dao::models::ScoreEntity,
            crate::dao::models::TimelineEventKind,
            crate::state::match_status::MatchStatus,
            crate::error::ErrorBody,
            crate::error::ErrorKind,
        )
    ),
    tags(
        (name = "health", description = "Health and runtime counters"),
        (name = "realtime", description = "WebSocket endpoint for match subscribers"),
        (name = "ingress", description = "Out-of-band publishing for other services"),
    )
)]
pub struct ApiDoc;
