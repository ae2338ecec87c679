use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;

use crate::state::match_status::MatchStatus;

/// Identifier of a user account.
pub type UserId = String;
/// Identifier of a team.
pub type TeamId = String;
/// Identifier of a match, also used as the live topic identifier.
pub type MatchId = String;

/// User account as resolved by the identity layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable account identifier, carried in credentials as `userId`.
    pub id: UserId,
    /// Contact address of the account.
    pub email: String,
    /// Display name shown to other participants.
    pub name: String,
    /// Sport preference chosen at sign-up.
    #[serde(default)]
    pub sport: Option<String>,
}

/// Team record; only the coach matters for live access decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Team identifier referenced by matches.
    pub id: TeamId,
    /// Display name of the team.
    pub name: String,
    /// Owner/coach allowed to follow and drive this team's matches.
    #[serde(default)]
    pub coach_id: Option<UserId>,
}

/// Current score of a match.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ScoreEntity {
    /// Points of the home team.
    pub home: u32,
    /// Points of the away team.
    pub away: u32,
}

/// Recognised kinds of timeline entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    /// Regular goal.
    Goal,
    /// Goal credited to the opposing team.
    OwnGoal,
    /// Assist on a goal.
    Assist,
    /// Penalty awarded.
    Penalty,
    /// Foul committed.
    Foul,
    /// Caution shown to a player.
    YellowCard,
    /// Player sent off.
    RedCard,
    /// Player swapped in or out.
    Substitution,
    /// Player injured.
    Injury,
    /// Team timeout.
    Timeout,
    /// Start of a period or half.
    PeriodStart,
    /// End of a period or half.
    PeriodEnd,
    /// Free-form note from a coach.
    Note,
}

impl TimelineEventKind {
    /// Stored string form, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::OwnGoal => "own_goal",
            Self::Assist => "assist",
            Self::Penalty => "penalty",
            Self::Foul => "foul",
            Self::YellowCard => "yellow_card",
            Self::RedCard => "red_card",
            Self::Substitution => "substitution",
            Self::Injury => "injury",
            Self::Timeout => "timeout",
            Self::PeriodStart => "period_start",
            Self::PeriodEnd => "period_end",
            Self::Note => "note",
        }
    }
}

/// Entry appended to a match timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEntryEntity {
    /// Server-assigned entry identifier.
    pub id: String,
    /// What happened.
    pub kind: TimelineEventKind,
    /// Match minute, when the coach supplied one.
    pub minute: Option<u16>,
    /// Team involved; must play in the match.
    pub team_id: Option<TeamId>,
    /// Player involved, free-form.
    pub player_id: Option<String>,
    /// Optional free text.
    pub description: Option<String>,
    /// Coach who recorded the entry.
    pub added_by: UserId,
    /// Server time the entry was accepted.
    pub timestamp: SystemTime,
}

/// Authoritative match record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntity {
    /// Match identifier, also the live topic name.
    pub id: MatchId,
    /// Home side.
    pub home_team_id: TeamId,
    /// Away side.
    pub away_team_id: TeamId,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Current score.
    pub score: ScoreEntity,
    /// Timeline entries in insertion order.
    pub timeline: Vec<TimelineEntryEntity>,
    /// Where the match is played, if known.
    pub venue: Option<String>,
    /// Creation time of the record.
    pub created_at: SystemTime,
    /// Time of the last applied mutation.
    pub updated_at: SystemTime,
}

/// Change carried by an accepted mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchChangeEntity {
    /// Replace the score.
    Score(ScoreEntity),
    /// Append a timeline entry.
    TimelineEvent(TimelineEntryEntity),
    /// Move the status, conditional on `from` still being current.
    Status {
        /// Status the change was validated against.
        from: MatchStatus,
        /// New status.
        to: MatchStatus,
    },
}

/// Entry of a match's mutation log; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutationRecordEntity {
    /// Record identifier.
    pub id: String,
    /// Match the change applies to.
    pub match_id: MatchId,
    /// The change itself.
    pub change: MatchChangeEntity,
    /// Actor who submitted it.
    pub submitted_by: UserId,
    /// Server time of acceptance.
    pub recorded_at: SystemTime,
}

/// Result of applying a mutation against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Change applied and logged; carries the updated match.
    Applied(MatchEntity),
    /// No match with the requested id exists.
    MatchMissing,
    /// Status compare-and-set failed because the stored status differs.
    StatusConflict {
        /// Status found in the store.
        actual: MatchStatus,
    },
}

/// Chat message before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    /// Match topic the message belongs to.
    pub match_id: MatchId,
    /// Sender.
    pub user_id: UserId,
    /// Trimmed message body.
    pub content: String,
}

/// Persisted chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessageEntity {
    /// Store-assigned identifier.
    pub id: String,
    /// Match topic the message belongs to.
    pub match_id: MatchId,
    /// Sender.
    pub user_id: UserId,
    /// Message body.
    pub content: String,
    /// Message category; always `text` for relayed chat.
    pub message_type: String,
    /// Store-assigned time.
    pub timestamp: SystemTime,
}

impl ChatMessageEntity {
    /// Stamp a new message with a fresh id and the current time.
    pub fn stamp(message: NewChatMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            match_id: message.match_id,
            user_id: message.user_id,
            content: message.content,
            message_type: "text".into(),
            timestamp: SystemTime::now(),
        }
    }
}
