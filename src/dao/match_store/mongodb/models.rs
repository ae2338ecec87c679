use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{
    dao::models::{
        ChatMessageEntity, MatchChangeEntity, MatchEntity, MutationRecordEntity, ScoreEntity,
        TeamEntity, TimelineEntryEntity, TimelineEventKind, UserEntity,
    },
    state::match_status::MatchStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    name: String,
    #[serde(default)]
    sport: Option<String>,
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
            sport: value.sport,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    coach_id: Option<String>,
}

impl From<MongoTeamDocument> for TeamEntity {
    fn from(value: MongoTeamDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            coach_id: value.coach_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MongoScore {
    home: i64,
    away: i64,
}

impl From<ScoreEntity> for MongoScore {
    fn from(value: ScoreEntity) -> Self {
        Self {
            home: i64::from(value.home),
            away: i64::from(value.away),
        }
    }
}

impl From<MongoScore> for ScoreEntity {
    fn from(value: MongoScore) -> Self {
        Self {
            home: u32::try_from(value.home).unwrap_or_default(),
            away: u32::try_from(value.away).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTimelineEntry {
    id: String,
    kind: TimelineEventKind,
    #[serde(default)]
    minute: Option<i32>,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    added_by: String,
    timestamp: DateTime,
}

impl From<TimelineEntryEntity> for MongoTimelineEntry {
    fn from(value: TimelineEntryEntity) -> Self {
        Self {
            id: value.id,
            kind: value.kind,
            minute: value.minute.map(i32::from),
            team_id: value.team_id,
            player_id: value.player_id,
            description: value.description,
            added_by: value.added_by,
            timestamp: DateTime::from_system_time(value.timestamp),
        }
    }
}

impl From<MongoTimelineEntry> for TimelineEntryEntity {
    fn from(value: MongoTimelineEntry) -> Self {
        Self {
            id: value.id,
            kind: value.kind,
            minute: value.minute.and_then(|m| u16::try_from(m).ok()),
            team_id: value.team_id,
            player_id: value.player_id,
            description: value.description,
            added_by: value.added_by,
            timestamp: value.timestamp.to_system_time(),
        }
    }
}

/// Document pushed onto `timeline` by `$push`.
pub fn timeline_entry_doc(entry: &TimelineEntryEntity) -> Document {
    doc! {
        "id": entry.id.as_str(),
        "kind": entry.kind.as_str(),
        "minute": entry.minute.map(i32::from),
        "team_id": entry.team_id.clone(),
        "player_id": entry.player_id.clone(),
        "description": entry.description.clone(),
        "added_by": entry.added_by.as_str(),
        "timestamp": DateTime::from_system_time(entry.timestamp),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    home_team_id: String,
    away_team_id: String,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    score: MongoScore,
    #[serde(default)]
    timeline: Vec<MongoTimelineEntry>,
    #[serde(default)]
    venue: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            home_team_id: value.home_team_id,
            away_team_id: value.away_team_id,
            status: value.status,
            score: value.score.into(),
            timeline: value.timeline.into_iter().map(Into::into).collect(),
            venue: value.venue,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MongoChangeDocument {
    Score(MongoScore),
    TimelineEvent(MongoTimelineEntry),
    Status { from: MatchStatus, to: MatchStatus },
}

impl From<MatchChangeEntity> for MongoChangeDocument {
    fn from(value: MatchChangeEntity) -> Self {
        match value {
            MatchChangeEntity::Score(score) => Self::Score(score.into()),
            MatchChangeEntity::TimelineEvent(entry) => Self::TimelineEvent(entry.into()),
            MatchChangeEntity::Status { from, to } => Self::Status { from, to },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMutationDocument {
    #[serde(rename = "_id")]
    id: String,
    match_id: String,
    change: MongoChangeDocument,
    submitted_by: String,
    recorded_at: DateTime,
}

impl From<MutationRecordEntity> for MongoMutationDocument {
    fn from(value: MutationRecordEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            change: value.change.into(),
            submitted_by: value.submitted_by,
            recorded_at: DateTime::from_system_time(value.recorded_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChatDocument {
    #[serde(rename = "_id")]
    id: String,
    match_id: String,
    user_id: String,
    content: String,
    message_type: String,
    timestamp: DateTime,
}

impl From<ChatMessageEntity> for MongoChatDocument {
    fn from(value: ChatMessageEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            user_id: value.user_id,
            content: value.content,
            message_type: value.message_type,
            timestamp: DateTime::from_system_time(value.timestamp),
        }
    }
}
