use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load user `{id}`")]
    LoadUser {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load team `{id}`")]
    LoadTeam {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load match `{id}`")]
    LoadMatch {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update match `{id}`")]
    UpdateMatch {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to record mutation `{id}` for match `{match_id}`")]
    RecordMutation {
        id: String,
        match_id: String,
        #[source]
        source: MongoError,
    },
    #[error("mutation transaction failed for match `{match_id}`")]
    Transaction {
        match_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save chat message for match `{match_id}`")]
    SaveChatMessage {
        match_id: String,
        #[source]
        source: MongoError,
    },
}
