use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use axum_valid::Valid;
use tracing::warn;

use crate::{
    dto::{
        ingress::{DeliveryResponse, MatchBroadcastRequest, NotificationRequest},
        validation::validate_identifier,
    },
    error::{AppError, ServiceError},
    services::broadcast,
    state::SharedState,
};

const INGRESS_TOKEN_HEADER: &str = "x-ingress-token";

/// Publishing endpoints for services that write matches outside the socket path.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/ingress/matches/{matchId}/broadcast",
            post(broadcast_match_update),
        )
        .route(
            "/ingress/users/{userId}/notifications",
            post(notify_user),
        )
        .route_layer(middleware::from_fn_with_state(state, require_ingress_token))
}

/// Broadcast an externally persisted update to the match's subscribers.
#[utoipa::path(
    post,
    path = "/ingress/matches/{matchId}/broadcast",
    tag = "ingress",
    params(
        ("X-Ingress-Token" = String, Header, description = "Shared ingress token"),
        ("matchId" = String, Path, description = "Match whose subscribers receive the update"),
    ),
    request_body = MatchBroadcastRequest,
    responses(
        (status = 202, description = "Update queued to subscribers", body = DeliveryResponse),
        (status = 400, description = "Invalid body", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid ingress token", body = crate::error::ErrorBody),
    )
)]
pub async fn broadcast_match_update(
    State(state): State<SharedState>,
    Path(match_id): Path<String>,
    Valid(Json(payload)): Valid<Json<MatchBroadcastRequest>>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    checked_identifier(&match_id)?;
    let delivered = broadcast::broadcast_match_update(
        &state,
        &match_id,
        payload.update_type,
        payload.update_data,
        payload.updated_by,
    );
    Ok((StatusCode::ACCEPTED, Json(DeliveryResponse { delivered })))
}

/// Deliver a notification to every live connection of a user.
#[utoipa::path(
    post,
    path = "/ingress/users/{userId}/notifications",
    tag = "ingress",
    params(
        ("X-Ingress-Token" = String, Header, description = "Shared ingress token"),
        ("userId" = String, Path, description = "Recipient user"),
    ),
    request_body = NotificationRequest,
    responses(
        (status = 202, description = "Notification queued", body = DeliveryResponse),
        (status = 400, description = "Invalid body", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid ingress token", body = crate::error::ErrorBody),
    )
)]
pub async fn notify_user(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Valid(Json(payload)): Valid<Json<NotificationRequest>>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    checked_identifier(&user_id)?;
    let delivered =
        broadcast::notify_user(&state, &user_id, payload.title, payload.body, payload.data);
    Ok((StatusCode::ACCEPTED, Json(DeliveryResponse { delivered })))
}

fn checked_identifier(value: &str) -> Result<(), AppError> {
    validate_identifier(value)
        .map_err(|_| ServiceError::InvalidRequest(format!("invalid identifier `{value}`")).into())
}

async fn require_ingress_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(INGRESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing ingress token header `X-Ingress-Token`".into())
        })?;

    match state.config().ingress_token() {
        Some(expected) if expected == provided => Ok(next.run(req).await),
        Some(_) => {
            warn!("ingress request with invalid token");
            Err(AppError::Unauthorized("invalid ingress token".into()))
        }
        None => Err(AppError::Unauthorized("ingress is not configured".into())),
    }
}
