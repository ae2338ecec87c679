use tracing::{debug, info};

use crate::{
    auth::{Actor, access::{self, MatchParticipants}},
    dto::{
        format_system_time,
        ws::{MatchSnapshot, ServerMessage, TimelineEntryView},
    },
    error::ServiceError,
    state::{AppState, registry::ConnectionId},
};

/// Check access, then join the match topic and queue a fresh snapshot to the joining connection.
///
/// Runs under the match gate so no mutation can be persisted between the snapshot
/// read and the join.
pub async fn subscribe(
    state: &AppState,
    connection_id: ConnectionId,
    actor: &Actor,
    match_id: &str,
) -> Result<MatchSnapshot, ServiceError> {
    let _gate = state.gates().acquire(match_id).await;
    let participants = access::ensure_can_access(state, &actor.id, match_id).await?;
    let snapshot = build_snapshot(&participants);

    let frame = ServerMessage::MatchState(snapshot.clone()).to_frame();
    if !state.registry().join_topic(connection_id, match_id, frame) {
        return Err(ServiceError::InvalidRequest(
            "connection is not registered".into(),
        ));
    }

    info!(
        connection_id = %connection_id,
        user_id = %actor.id,
        match_id,
        members = state.topics().member_count(match_id),
        "subscribed to match"
    );
    Ok(snapshot)
}

/// Leave the match topic; a no-op for non-members.
pub fn unsubscribe(state: &AppState, connection_id: ConnectionId, match_id: &str) -> bool {
    let removed = state.registry().leave_topic(connection_id, match_id);
    debug!(connection_id = %connection_id, match_id, removed, "unsubscribe processed");
    removed
}

/// Client view of a match and its team names.
pub fn build_snapshot(participants: &MatchParticipants) -> MatchSnapshot {
    let entity = &participants.entity;
    let (home_team_name, away_team_name) = participants.team_names();
    MatchSnapshot {
        id: entity.id.clone(),
        home_team_id: entity.home_team_id.clone(),
        away_team_id: entity.away_team_id.clone(),
        home_team_name,
        away_team_name,
        status: entity.status,
        score: entity.score,
        timeline: entity.timeline.iter().map(TimelineEntryView::from).collect(),
        venue: entity.venue.clone(),
        created_at: format_system_time(entity.created_at),
        updated_at: format_system_time(entity.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{connect, drain, seeded_state};

    #[tokio::test]
    async fn coach_receives_snapshot_and_joins() {
        let (state, _store) = seeded_state().await;
        let (c1, actor, mut rx) = connect(&state, "coach1");

        let snapshot = subscribe(&state, c1, &actor, "m1").await.unwrap();

        assert_eq!(snapshot.home_team_name.as_deref(), Some("Home FC"));
        assert!(state.topics().is_member("m1", c1));
        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "match-state");
        assert_eq!(frames[0]["data"]["status"], "upcoming");
        assert_eq!(frames[0]["data"]["awayTeamName"], "Away FC");
    }

    #[tokio::test]
    async fn outsider_is_denied_without_state_change() {
        let (state, _store) = seeded_state().await;
        let (c2, actor, mut rx) = connect(&state, "outsider");

        let err = subscribe(&state, c2, &actor, "m1").await.unwrap_err();

        assert!(matches!(err, ServiceError::PermissionDenied(_)));
        assert!(!state.topics().is_member("m1", c2));
        assert_eq!(state.topics().active_topics(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let (state, _store) = seeded_state().await;
        let (c1, actor, _rx) = connect(&state, "coach1");
        let err = subscribe(&state, c1, &actor, "missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn repeated_unsubscribe_is_harmless() {
        let (state, _store) = seeded_state().await;
        let (c1, actor, _rx) = connect(&state, "coach1");
        subscribe(&state, c1, &actor, "m1").await.unwrap();

        assert!(unsubscribe(&state, c1, "m1"));
        assert!(!unsubscribe(&state, c1, "m1"));
        assert!(!unsubscribe(&state, c1, "never-joined"));
        assert_eq!(state.topics().subscription_total(), 0);
    }

    #[tokio::test]
    async fn degraded_state_is_unavailable() {
        let (state, _store) = seeded_state().await;
        state.clear_match_store().await;
        let (c1, actor, _rx) = connect(&state, "coach1");
        let err = subscribe(&state, c1, &actor, "m1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
        assert!(state.gates().is_empty());
    }
}
