use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Scheduled but not started.
    #[default]
    Upcoming,
    /// Currently being played.
    Ongoing,
    /// Finished with a final score.
    Completed,
    /// Called off before or during play.
    Cancelled,
}

/// Error returned when a status change is not allowed from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status transition: {from:?} -> {to:?}")]
pub struct InvalidStatusTransition {
    /// Status the match was in when the change was requested.
    pub from: MatchStatus,
    /// Status that was requested.
    pub to: MatchStatus,
}

impl MatchStatus {
    /// Stored string form, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition can leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Validate a transition and return the next status.
    pub fn transition_to(self, to: MatchStatus) -> Result<MatchStatus, InvalidStatusTransition> {
        match (self, to) {
            (Self::Upcoming, Self::Ongoing)
            | (Self::Ongoing, Self::Completed)
            | (Self::Upcoming, Self::Cancelled)
            | (Self::Ongoing, Self::Cancelled) => Ok(to),
            (from, to) => Err(InvalidStatusTransition { from, to }),
        }
    }
}
