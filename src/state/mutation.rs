use std::time::SystemTime;

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Actor,
    dao::models::{
        MatchChangeEntity, MatchEntity, MatchId, ScoreEntity, TeamId, TimelineEntryEntity,
        TimelineEventKind,
    },
    error::ServiceError,
    state::match_status::MatchStatus,
};

/// Wire tag of a score change.
pub const UPDATE_SCORE: &str = "score";
/// Wire tag of a timeline entry.
pub const UPDATE_EVENT: &str = "event";
/// Wire tag of a status change.
pub const UPDATE_STATUS: &str = "status";

#[derive(Debug, Clone, Deserialize, Validate)]
struct ScorePayload {
    #[validate(range(max = 999))]
    home: u32,
    #[validate(range(max = 999))]
    away: u32,
}

/// Timeline entry as submitted by a client, before the server stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePayload {
    /// Recognised entry kind.
    #[serde(rename = "type", alias = "kind")]
    pub kind: TimelineEventKind,
    /// Match minute the entry refers to.
    #[validate(range(max = 300))]
    pub minute: Option<u16>,
    /// Team involved; must take part in the match.
    pub team_id: Option<TeamId>,
    /// Player involved.
    pub player_id: Option<String>,
    /// Free-text detail.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
struct StatusPayload {
    status: MatchStatus,
}

/// Decoded client mutation, one variant per recognised update type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMutation {
    /// Replace the score.
    Score(ScoreEntity),
    /// Append a timeline entry.
    TimelineEvent(TimelinePayload),
    /// Move the match to another status.
    Status(MatchStatus),
}

impl MatchMutation {
    /// Decode and validate `data` according to `update_type`.
    pub fn decode(update_type: &str, data: Value) -> Result<Self, ServiceError> {
        match update_type {
            UPDATE_SCORE => {
                let payload: ScorePayload = payload(data)?;
                Ok(Self::Score(ScoreEntity {
                    home: payload.home,
                    away: payload.away,
                }))
            }
            UPDATE_EVENT => Ok(Self::TimelineEvent(payload(data)?)),
            UPDATE_STATUS => {
                let payload: StatusPayload = payload(data)?;
                Ok(Self::Status(payload.status))
            }
            other => Err(ServiceError::InvalidMutation(format!(
                "unknown update type `{other}`"
            ))),
        }
    }

    /// Wire tag of this mutation.
    pub fn update_type(&self) -> &'static str {
        match self {
            Self::Score(_) => UPDATE_SCORE,
            Self::TimelineEvent(_) => UPDATE_EVENT,
            Self::Status(_) => UPDATE_STATUS,
        }
    }

    /// Check the mutation against the current match and build the change to persist.
    pub fn into_change(
        self,
        current: &MatchEntity,
        actor: &Actor,
        now: SystemTime,
    ) -> Result<MatchChangeEntity, ServiceError> {
        match self {
            Self::Score(score) => Ok(MatchChangeEntity::Score(score)),
            Self::TimelineEvent(payload) => {
                if let Some(team_id) = payload
                    .team_id
                    .as_ref()
                    .filter(|id| **id != current.home_team_id && **id != current.away_team_id)
                {
                    return Err(ServiceError::InvalidMutation(format!(
                        "team `{team_id}` does not play in match `{}`",
                        current.id
                    )));
                }

                Ok(MatchChangeEntity::TimelineEvent(TimelineEntryEntity {
                    id: Uuid::new_v4().to_string(),
                    kind: payload.kind,
                    minute: payload.minute,
                    team_id: payload.team_id,
                    player_id: payload.player_id,
                    description: payload.description,
                    added_by: actor.id.clone(),
                    timestamp: now,
                }))
            }
            Self::Status(to) => {
                let from = current.status;
                from.transition_to(to)
                    .map_err(|err| ServiceError::InvalidMutation(err.to_string()))?;
                Ok(MatchChangeEntity::Status { from, to })
            }
        }
    }
}

/// Accepted and persisted mutation, ready to be broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchMutationEvent {
    /// Match the change applies to.
    pub match_id: MatchId,
    /// Persisted change.
    pub change: MatchChangeEntity,
    /// Display name of the submitting actor.
    pub updated_by: String,
    /// Server-assigned time of the change.
    pub timestamp: SystemTime,
}

impl MatchMutationEvent {
    /// Wire tag of the carried change.
    pub fn update_type(&self) -> &'static str {
        match self.change {
            MatchChangeEntity::Score(_) => UPDATE_SCORE,
            MatchChangeEntity::TimelineEvent(_) => UPDATE_EVENT,
            MatchChangeEntity::Status { .. } => UPDATE_STATUS,
        }
    }
}

fn payload<T: DeserializeOwned + Validate>(data: Value) -> Result<T, ServiceError> {
    let payload: T = serde_json::from_value(data)
        .map_err(|err| ServiceError::InvalidMutation(err.to_string()))?;
    payload
        .validate()
        .map_err(|err| ServiceError::InvalidMutation(err.to_string()))?;
    Ok(payload)
}
