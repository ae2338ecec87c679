use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoChatDocument, MongoMatchDocument, MongoMutationDocument, MongoTeamDocument,
        MongoUserDocument, timeline_entry_doc,
    },
};
use crate::dao::{
    match_store::MatchStore,
    models::{
        ChatMessageEntity, MatchChangeEntity, MatchEntity, MatchId, MutationOutcome,
        MutationRecordEntity, NewChatMessage, TeamEntity, TeamId, UserEntity, UserId,
    },
    storage::StorageResult,
};

const USER_COLLECTION_NAME: &str = "users";
const TEAM_COLLECTION_NAME: &str = "teams";
const MATCH_COLLECTION_NAME: &str = "matches";
const MUTATION_COLLECTION_NAME: &str = "match_mutations";
const CHAT_COLLECTION_NAME: &str = "chat_messages";

/// [`MatchStore`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let indexes = [
            (MUTATION_COLLECTION_NAME, "match_id,recorded_at", doc! { "match_id": 1, "recorded_at": 1 }, "mutation_match_idx"),
            (CHAT_COLLECTION_NAME, "match_id,timestamp", doc! { "match_id": 1, "timestamp": 1 }, "chat_match_idx"),
        ];

        let database = self.database().await;
        for (collection, index, keys, name) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();

            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.state.read().await.database.clone()
    }

    async fn client(&self) -> Client {
        self.inner.state.read().await.client.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.inner.state.read().await.database.collection::<T>(name)
    }

    async fn find_user(&self, id: UserId) -> MongoResult<Option<UserEntity>> {
        let collection = self.collection::<MongoUserDocument>(USER_COLLECTION_NAME).await;
        let document = collection
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|source| MongoDaoError::LoadUser { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_team(&self, id: TeamId) -> MongoResult<Option<TeamEntity>> {
        let collection = self.collection::<MongoTeamDocument>(TEAM_COLLECTION_NAME).await;
        let document = collection
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|source| MongoDaoError::LoadTeam { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_match(&self, id: MatchId) -> MongoResult<Option<MatchEntity>> {
        let collection = self.collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME).await;
        let document = collection
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;
        Ok(document.map(Into::into))
    }

    /// Apply the match change and append the log entry in one transaction.
    ///
    /// Transactions require a replica set or sharded deployment.
    async fn apply_mutation(&self, record: MutationRecordEntity) -> MongoResult<MutationOutcome> {
        let match_id = record.match_id.clone();
        let (filter, update) = change_update(&record);
        let client = self.client().await;
        let matches = self.collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME).await;
        let mutations = self
            .collection::<MongoMutationDocument>(MUTATION_COLLECTION_NAME)
            .await;

        let transaction_error = |source: mongodb::error::Error| MongoDaoError::Transaction {
            match_id: match_id.clone(),
            source,
        };
        let mut session = client.start_session().await.map_err(transaction_error)?;
        session
            .start_transaction()
            .await
            .map_err(transaction_error)?;

        // Dropping the session on an early return aborts the transaction.
        let updated = matches
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::UpdateMatch {
                id: match_id.clone(),
                source,
            })?;

        let Some(document) = updated else {
            // Either the match is gone or the status filter did not match.
            let current = matches
                .find_one(doc! { "_id": match_id.as_str() })
                .session(&mut session)
                .await
                .map_err(|source| MongoDaoError::LoadMatch {
                    id: match_id.clone(),
                    source,
                })?;
            session
                .abort_transaction()
                .await
                .map_err(transaction_error)?;
            return Ok(match current {
                None => MutationOutcome::MatchMissing,
                Some(current) => MutationOutcome::StatusConflict {
                    actual: current.status,
                },
            });
        };

        let record_id = record.id.clone();
        mutations
            .insert_one(MongoMutationDocument::from(record))
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::RecordMutation {
                id: record_id,
                match_id: match_id.clone(),
                source,
            })?;

        session
            .commit_transaction()
            .await
            .map_err(transaction_error)?;

        Ok(MutationOutcome::Applied(document.into()))
    }

    async fn save_chat_message(&self, message: NewChatMessage) -> MongoResult<ChatMessageEntity> {
        let entity = ChatMessageEntity::stamp(message);
        let collection = self.collection::<MongoChatDocument>(CHAT_COLLECTION_NAME).await;
        collection
            .insert_one(MongoChatDocument::from(entity.clone()))
            .await
            .map_err(|source| MongoDaoError::SaveChatMessage {
                match_id: entity.match_id.clone(),
                source,
            })?;
        Ok(entity)
    }
}

/// Filter and update document for the match change carried by `record`.
///
/// Status changes filter on the expected current status, so a lost race
/// matches no document.
fn change_update(record: &MutationRecordEntity) -> (Document, Document) {
    let match_id = record.match_id.as_str();
    let updated_at = DateTime::from_system_time(record.recorded_at);

    match &record.change {
        MatchChangeEntity::Score(score) => (
            doc! { "_id": match_id },
            doc! { "$set": {
                "score.home": i64::from(score.home),
                "score.away": i64::from(score.away),
                "updated_at": updated_at,
            } },
        ),
        MatchChangeEntity::TimelineEvent(entry) => (
            doc! { "_id": match_id },
            doc! {
                "$push": { "timeline": timeline_entry_doc(entry) },
                "$set": { "updated_at": updated_at },
            },
        ),
        MatchChangeEntity::Status { from, to } => (
            doc! { "_id": match_id, "status": from.as_str() },
            doc! { "$set": { "status": to.as_str(), "updated_at": updated_at } },
        ),
    }
}

impl MatchStore for MongoMatchStore {
    fn find_user(&self, id: UserId) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn find_team(&self, id: TeamId) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team(id).await.map_err(Into::into) })
    }

    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn apply_mutation(
        &self,
        record: MutationRecordEntity,
    ) -> BoxFuture<'static, StorageResult<MutationOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.apply_mutation(record).await.map_err(Into::into) })
    }

    fn save_chat_message(
        &self,
        message: NewChatMessage,
    ) -> BoxFuture<'static, StorageResult<ChatMessageEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_chat_message(message).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
