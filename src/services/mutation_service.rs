use std::time::SystemTime;

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{Actor, access},
    dao::models::{MutationOutcome, MutationRecordEntity},
    dto::ws::{MatchUpdatedPayload, ServerMessage},
    error::ServiceError,
    services::broadcast,
    state::{
        AppState,
        mutation::{MatchMutation, MatchMutationEvent},
    },
};

/// Check, validate, persist and broadcast one match mutation.
///
/// The match gate is held from the access check until the broadcast is queued, so
/// subscribers observe mutations of a match in persistence order. Nothing is
/// broadcast unless the store accepted the change.
pub async fn submit(
    state: &AppState,
    actor: &Actor,
    match_id: &str,
    update_type: &str,
    update_data: Value,
) -> Result<MatchMutationEvent, ServiceError> {
    let _gate = state.gates().acquire(match_id).await;

    let participants = access::ensure_can_mutate(state, &actor.id, match_id).await?;
    let mutation = MatchMutation::decode(update_type, update_data)?;

    let now = SystemTime::now();
    let change = mutation.into_change(&participants.entity, actor, now)?;
    let record = MutationRecordEntity {
        id: Uuid::new_v4().to_string(),
        match_id: match_id.to_owned(),
        change: change.clone(),
        submitted_by: actor.id.clone(),
        recorded_at: now,
    };

    match state
        .run_storage(|store| store.apply_mutation(record))
        .await?
    {
        MutationOutcome::Applied(_) => {}
        MutationOutcome::MatchMissing => {
            return Err(ServiceError::NotFound(format!("match `{match_id}`")));
        }
        MutationOutcome::StatusConflict { actual } => {
            return Err(ServiceError::InvalidMutation(format!(
                "match status changed concurrently to `{}`",
                actual.as_str()
            )));
        }
    }

    let event = MatchMutationEvent {
        match_id: match_id.to_owned(),
        change,
        updated_by: actor.name.clone(),
        timestamp: now,
    };
    let delivered = broadcast::publish(
        state,
        match_id,
        &ServerMessage::MatchUpdated(MatchUpdatedPayload::from(&event)),
    );

    info!(
        user_id = %actor.id,
        match_id,
        update_type = event.update_type(),
        delivered,
        "match mutation accepted"
    );
    Ok(event)
}
