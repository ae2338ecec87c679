//! Process-local [`MatchStore`] used for development runs and tests.

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, SystemTime},
};

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use super::MatchStore;
use crate::dao::{
    models::{
        ChatMessageEntity, MatchChangeEntity, MatchEntity, MatchId, MutationOutcome,
        MutationRecordEntity, NewChatMessage, ScoreEntity, TeamEntity, TeamId, UserEntity, UserId,
    },
    storage::{StorageError, StorageResult, StoreBackend},
};
use crate::state::match_status::MatchStatus;

/// Failures produced by the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("in-memory store is offline")]
    Offline,
    #[error("in-memory store rejected the write")]
    WriteRejected,
    #[error("failed to read seed file `{path}`")]
    ReadSeed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file `{path}`")]
    ParseSeed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<MemoryStoreError> for StorageError {
    fn from(err: MemoryStoreError) -> Self {
        StorageError::unavailable(StoreBackend::Memory, err)
    }
}

/// JSON fixture used to pre-populate the store.
#[derive(Debug, Default, Deserialize)]
pub struct MatchStoreSeed {
    #[serde(default)]
    pub users: Vec<UserEntity>,
    #[serde(default)]
    pub teams: Vec<TeamEntity>,
    #[serde(default)]
    pub matches: Vec<MatchSeed>,
}

/// Minimal match definition inside a [`MatchStoreSeed`].
#[derive(Debug, Clone, Deserialize)]
pub struct MatchSeed {
    pub id: MatchId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub score: ScoreEntity,
    #[serde(default)]
    pub venue: Option<String>,
}

impl From<MatchSeed> for MatchEntity {
    fn from(seed: MatchSeed) -> Self {
        let now = SystemTime::now();
        Self {
            id: seed.id,
            home_team_id: seed.home_team_id,
            away_team_id: seed.away_team_id,
            status: seed.status,
            score: seed.score,
            timeline: Vec::new(),
            venue: seed.venue,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, UserEntity>,
    teams: HashMap<TeamId, TeamEntity>,
    matches: HashMap<MatchId, MatchEntity>,
    mutation_log: HashMap<MatchId, Vec<MutationRecordEntity>>,
    chat: Vec<ChatMessageEntity>,
}

#[derive(Default)]
struct MemoryInner {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
    reject_writes: AtomicBool,
    latency_ms: AtomicU64,
}

/// [`MatchStore`] keeping every record in process memory.
#[derive(Clone, Default)]
pub struct InMemoryMatchStore {
    inner: Arc<MemoryInner>,
}

impl InMemoryMatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `seed`.
    pub fn from_seed(seed: MatchStoreSeed) -> Self {
        let mut state = MemoryState::default();
        state.users = seed.users.into_iter().map(|u| (u.id.clone(), u)).collect();
        state.teams = seed.teams.into_iter().map(|t| (t.id.clone(), t)).collect();
        state.matches = seed
            .matches
            .into_iter()
            .map(|m| (m.id.clone(), MatchEntity::from(m)))
            .collect();

        Self {
            inner: Arc::new(MemoryInner {
                state: RwLock::new(state),
                ..MemoryInner::default()
            }),
        }
    }

    /// Load a JSON seed file from disk.
    pub fn from_seed_file(path: &Path) -> Result<Self, MemoryStoreError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| MemoryStoreError::ReadSeed {
            path: display.clone(),
            source,
        })?;
        let seed = serde_json::from_str::<MatchStoreSeed>(&contents)
            .map_err(|source| MemoryStoreError::ParseSeed {
                path: display,
                source,
            })?;
        Ok(Self::from_seed(seed))
    }

    /// Insert or replace a user.
    pub async fn insert_user(&self, user: UserEntity) {
        self.inner.state.write().await.users.insert(user.id.clone(), user);
    }

    /// Insert or replace a team.
    pub async fn insert_team(&self, team: TeamEntity) {
        self.inner.state.write().await.teams.insert(team.id.clone(), team);
    }

    /// Insert or replace a match.
    pub async fn insert_match(&self, entity: MatchEntity) {
        self.inner
            .state
            .write()
            .await
            .matches
            .insert(entity.id.clone(), entity);
    }

    /// Mutation log recorded for a match, oldest first.
    pub async fn mutation_log(&self, match_id: &str) -> Vec<MutationRecordEntity> {
        self.inner
            .state
            .read()
            .await
            .mutation_log
            .get(match_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Chat messages stored for a match, oldest first.
    pub async fn chat_messages(&self, match_id: &str) -> Vec<ChatMessageEntity> {
        self.inner
            .state
            .read()
            .await
            .chat
            .iter()
            .filter(|message| message.match_id == match_id)
            .cloned()
            .collect()
    }

    /// Simulate a lost backend: every call fails until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Make writes fail while reads keep working.
    pub fn set_reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Delay every data call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        let latency = self.inner.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }

    fn ensure_online(&self) -> Result<(), MemoryStoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::Offline);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), MemoryStoreError> {
        self.ensure_online()?;
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::WriteRejected);
        }
        Ok(())
    }

    async fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> Result<T, MemoryStoreError> {
        self.simulate_latency().await;
        self.ensure_online()?;
        let state = self.inner.state.read().await;
        Ok(f(&*state))
    }

    async fn apply(&self, record: MutationRecordEntity) -> Result<MutationOutcome, MemoryStoreError> {
        self.simulate_latency().await;
        self.ensure_writable()?;
        let mut state = self.inner.state.write().await;
        let Some(entity) = state.matches.get_mut(&record.match_id) else {
            return Ok(MutationOutcome::MatchMissing);
        };

        match &record.change {
            MatchChangeEntity::Score(score) => entity.score = *score,
            MatchChangeEntity::TimelineEvent(entry) => entity.timeline.push(entry.clone()),
            MatchChangeEntity::Status { from, to } => {
                if entity.status != *from {
                    return Ok(MutationOutcome::StatusConflict {
                        actual: entity.status,
                    });
                }
                entity.status = *to;
            }
        }
        entity.updated_at = record.recorded_at;
        let updated = entity.clone();

        state
            .mutation_log
            .entry(record.match_id.clone())
            .or_default()
            .push(record);

        Ok(MutationOutcome::Applied(updated))
    }

    async fn save_chat(&self, message: NewChatMessage) -> Result<ChatMessageEntity, MemoryStoreError> {
        self.simulate_latency().await;
        self.ensure_writable()?;
        let stored = ChatMessageEntity::stamp(message);
        self.inner.state.write().await.chat.push(stored.clone());
        Ok(stored)
    }
}

impl MatchStore for InMemoryMatchStore {
    fn find_user(&self, id: UserId) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read(|state| state.users.get(&id).cloned())
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: TeamId) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read(|state| state.teams.get(&id).cloned())
                .await
                .map_err(Into::into)
        })
    }

    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read(|state| state.matches.get(&id).cloned())
                .await
                .map_err(Into::into)
        })
    }

    fn apply_mutation(
        &self,
        record: MutationRecordEntity,
    ) -> BoxFuture<'static, StorageResult<MutationOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.apply(record).await.map_err(Into::into) })
    }

    fn save_chat_message(
        &self,
        message: NewChatMessage,
    ) -> BoxFuture<'static, StorageResult<ChatMessageEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_chat(message).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online().map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online().map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryMatchStore {
        let seed: MatchStoreSeed = serde_json::from_value(serde_json::json!({
            "teams": [
                { "id": "t1", "name": "Harbour FC", "coach_id": "u1" },
                { "id": "t2", "name": "Valley United" }
            ],
            "matches": [
                { "id": "m1", "home_team_id": "t1", "away_team_id": "t2", "status": "ongoing" }
            ]
        }))
        .unwrap();
        InMemoryMatchStore::from_seed(seed)
    }

    fn record(change: MatchChangeEntity) -> MutationRecordEntity {
        MutationRecordEntity {
            id: "r1".into(),
            match_id: "m1".into(),
            change,
            submitted_by: "u1".into(),
            recorded_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn seed_defaults_missing_fields() {
        let store = seeded();
        let entity = store.find_match("m1".into()).await.unwrap().unwrap();
        assert_eq!(entity.status, MatchStatus::Ongoing);
        assert_eq!(entity.score, ScoreEntity::default());
        let team = store.find_team("t2".into()).await.unwrap().unwrap();
        assert!(team.coach_id.is_none());
    }

    #[tokio::test]
    async fn score_mutation_is_applied_and_logged() {
        let store = seeded();
        let outcome = store
            .apply_mutation(record(MatchChangeEntity::Score(ScoreEntity { home: 3, away: 1 })))
            .await
            .unwrap();

        match outcome {
            MutationOutcome::Applied(entity) => {
                assert_eq!(entity.score, ScoreEntity { home: 3, away: 1 })
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(store.mutation_log("m1").await.len(), 1);
    }

    #[tokio::test]
    async fn status_mutation_requires_expected_status() {
        let store = seeded();
        let outcome = store
            .apply_mutation(record(MatchChangeEntity::Status {
                from: MatchStatus::Upcoming,
                to: MatchStatus::Ongoing,
            }))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MutationOutcome::StatusConflict {
                actual: MatchStatus::Ongoing
            }
        );
        assert!(store.mutation_log("m1").await.is_empty());
    }

    #[tokio::test]
    async fn unknown_match_is_reported() {
        let store = seeded();
        let mut missing = record(MatchChangeEntity::Score(ScoreEntity::default()));
        missing.match_id = "nope".into();
        assert_eq!(
            store.apply_mutation(missing).await.unwrap(),
            MutationOutcome::MatchMissing
        );
    }

    #[tokio::test]
    async fn rejected_writes_leave_state_untouched() {
        let store = seeded();
        store.set_reject_writes(true);

        let result = store
            .apply_mutation(record(MatchChangeEntity::Score(ScoreEntity { home: 1, away: 0 })))
            .await;
        assert!(result.is_err());
        assert!(store.find_match("m1".into()).await.is_ok());

        store.set_reject_writes(false);
        let entity = store.find_match("m1".into()).await.unwrap().unwrap();
        assert_eq!(entity.score, ScoreEntity::default());
    }

    #[tokio::test]
    async fn chat_messages_are_stamped_by_the_store() {
        let store = seeded();
        let saved = store
            .save_chat_message(NewChatMessage {
                match_id: "m1".into(),
                user_id: "u1".into(),
                content: "kick off".into(),
            })
            .await
            .unwrap();

        assert!(!saved.id.is_empty());
        assert_eq!(saved.message_type, "text");
        assert_eq!(store.chat_messages("m1").await, vec![saved]);
    }

    #[tokio::test]
    async fn offline_store_fails_health_check() {
        let store = seeded();
        store.set_offline(true);
        assert!(store.health_check().await.is_err());
        assert!(store.find_user("u1".into()).await.is_err());
    }
}
