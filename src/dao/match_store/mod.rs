pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::models::{
    ChatMessageEntity, MatchEntity, MatchId, MutationOutcome, MutationRecordEntity,
    NewChatMessage, TeamEntity, TeamId, UserEntity, UserId,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for users, teams, matches and chat.
pub trait MatchStore: Send + Sync {
    fn find_user(&self, id: UserId) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_team(&self, id: TeamId) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Apply the change carried by `record` and append the record to the match's mutation log.
    ///
    /// Both writes succeed or neither is visible.
    /// Status changes only apply when the stored status still equals the recorded `from`.
    fn apply_mutation(
        &self,
        record: MutationRecordEntity,
    ) -> BoxFuture<'static, StorageResult<MutationOutcome>>;
    /// Persist a chat message, assigning its id and timestamp.
    fn save_chat_message(
        &self,
        message: NewChatMessage,
    ) -> BoxFuture<'static, StorageResult<ChatMessageEntity>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Swappable handle to the installed [`MatchStore`], shared by the state and the identity layer.
#[derive(Clone, Default)]
pub struct StoreSlot {
    inner: Arc<RwLock<Option<Arc<dyn MatchStore>>>>,
}

impl StoreSlot {
    /// Current store, if one is installed.
    pub async fn current(&self) -> Option<Arc<dyn MatchStore>> {
        self.inner.read().await.as_ref().cloned()
    }

    /// Replace the installed store.
    pub async fn install(&self, store: Arc<dyn MatchStore>) {
        *self.inner.write().await = Some(store);
    }

    /// Drop the installed store; returns whether one was present.
    pub async fn clear(&self) -> bool {
        self.inner.write().await.take().is_some()
    }
}
