//! Per-request decision whether an actor may follow or drive a match.
//!
//! Nothing is cached: every subscribe, mutation and chat message re-reads the
//! match and both teams so coach changes take effect immediately.

use crate::{
    dao::models::{MatchEntity, TeamEntity},
    error::ServiceError,
    state::AppState,
};

/// Match together with its two teams as currently stored.
#[derive(Debug, Clone)]
pub struct MatchParticipants {
    /// Fresh match record.
    pub entity: MatchEntity,
    /// Home team, if it still exists.
    pub home: Option<TeamEntity>,
    /// Away team, if it still exists.
    pub away: Option<TeamEntity>,
}

impl MatchParticipants {
    /// Read rule: the actor coaches either team.
    pub fn can_access(&self, actor_id: &str) -> bool {
        self.is_coach(actor_id)
    }

    /// Write rule; currently the same as [`MatchParticipants::can_access`].
    pub fn can_mutate(&self, actor_id: &str) -> bool {
        self.is_coach(actor_id)
    }

    fn is_coach(&self, actor_id: &str) -> bool {
        [&self.home, &self.away]
            .into_iter()
            .flatten()
            .any(|team| team.coach_id.as_deref() == Some(actor_id))
    }

    /// Display names of the home and away teams.
    pub fn team_names(&self) -> (Option<String>, Option<String>) {
        (
            self.home.as_ref().map(|team| team.name.clone()),
            self.away.as_ref().map(|team| team.name.clone()),
        )
    }
}

/// Load a match and both of its teams; a missing match is `NotFound`.
pub async fn resolve(state: &AppState, match_id: &str) -> Result<MatchParticipants, ServiceError> {
    let id = match_id.to_owned();
    let entity = state
        .run_storage(|store| store.find_match(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}`")))?;

    let (home_id, away_id) = (entity.home_team_id.clone(), entity.away_team_id.clone());
    let (home, away) = futures::try_join!(
        state.run_storage(|store| store.find_team(home_id)),
        state.run_storage(|store| store.find_team(away_id)),
    )?;

    Ok(MatchParticipants { entity, home, away })
}

/// Resolve the match and fail with `PermissionDenied` unless the actor may observe it.
pub async fn ensure_can_access(
    state: &AppState,
    actor_id: &str,
    match_id: &str,
) -> Result<MatchParticipants, ServiceError> {
    let participants = resolve(state, match_id).await?;
    if !participants.can_access(actor_id) {
        return Err(ServiceError::PermissionDenied(format!(
            "no access to match `{match_id}`"
        )));
    }
    Ok(participants)
}

/// Resolve the match and fail with `PermissionDenied` unless the actor may change it.
pub async fn ensure_can_mutate(
    state: &AppState,
    actor_id: &str,
    match_id: &str,
) -> Result<MatchParticipants, ServiceError> {
    let participants = resolve(state, match_id).await?;
    if !participants.can_mutate(actor_id) {
        return Err(ServiceError::PermissionDenied(format!(
            "not allowed to update match `{match_id}`"
        )));
    }
    Ok(participants)
}
