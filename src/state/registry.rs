use std::{collections::HashSet, time::SystemTime};

use axum::extract::ws::Message;
use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::IndexSet;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::topics::TopicGroups;
use crate::{
    auth::Actor,
    dao::models::{MatchId, UserId},
};

/// Identifier assigned to a live connection.
pub type ConnectionId = Uuid;
/// Outbound queue drained by a connection's writer task.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Live connection tracked by the registry.
pub struct ConnectionEntry {
    /// Connection identifier.
    pub id: ConnectionId,
    /// Actor resolved at handshake.
    pub actor: Actor,
    /// When the handshake completed.
    pub established_at: SystemTime,
    /// Joined matches in join order.
    pub topics: IndexSet<MatchId>,
    tx: ConnectionSender,
}

/// Process-wide registry of authenticated connections and their topic memberships.
///
/// Locks are always taken registry first, topic group second.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    actors: DashMap<UserId, HashSet<ConnectionId>>,
    topics: TopicGroups,
}

impl ConnectionRegistry {
    /// Register a connection; a second call with the same id leaves the first entry untouched.
    pub fn register(&self, id: ConnectionId, actor: Actor, tx: ConnectionSender) -> bool {
        let user_id = actor.id.clone();
        match self.connections.entry(id) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(ConnectionEntry {
                    id,
                    actor,
                    established_at: SystemTime::now(),
                    topics: IndexSet::new(),
                    tx,
                });
            }
        }
        self.actors.entry(user_id).or_default().insert(id);
        true
    }

    /// Remove a connection and every membership it holds.
    pub fn unregister(&self, id: ConnectionId) -> Option<ConnectionEntry> {
        let (_, entry) = self.connections.remove(&id)?;
        for match_id in &entry.topics {
            self.topics.remove_member(match_id, id);
        }

        if let Some(mut ids) = self.actors.get_mut(&entry.actor.id) {
            ids.remove(&id);
        }
        self.actors
            .remove_if(&entry.actor.id, |_, ids| ids.is_empty());
        Some(entry)
    }

    /// Actor bound to a connection.
    pub fn lookup(&self, id: ConnectionId) -> Option<Actor> {
        self.connections.get(&id).map(|entry| entry.actor.clone())
    }

    /// Join a match group, queueing `greeting` ahead of any later broadcast.
    ///
    /// Returns `false` when the connection is not registered.
    pub fn join_topic(&self, id: ConnectionId, match_id: &str, greeting: Option<Message>) -> bool {
        let Some(mut entry) = self.connections.get_mut(&id) else {
            return false;
        };
        entry.topics.insert(match_id.to_owned());
        self.topics
            .insert_member(match_id, id, entry.tx.clone(), greeting);
        true
    }

    /// Leave a match group; leaving a group the connection is not in is a no-op.
    pub fn leave_topic(&self, id: ConnectionId, match_id: &str) -> bool {
        let Some(mut entry) = self.connections.get_mut(&id) else {
            return false;
        };
        entry.topics.shift_remove(match_id);
        self.topics.remove_member(match_id, id)
    }

    /// Whether the connection currently belongs to the match group.
    pub fn is_subscribed(&self, id: ConnectionId, match_id: &str) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|entry| entry.topics.contains(match_id))
    }

    /// Joined matches of a connection, in join order.
    pub fn topics_of(&self, id: ConnectionId) -> Vec<MatchId> {
        self.connections
            .get(&id)
            .map(|entry| entry.topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Queue a frame on a single connection.
    pub fn send_to(&self, id: ConnectionId, frame: Message) -> bool {
        let Some(tx) = self.connections.get(&id).map(|entry| entry.tx.clone()) else {
            return false;
        };
        tx.send(frame).is_ok()
    }

    /// Outbound queues of every live connection of an actor.
    pub fn senders_for_actor(&self, user_id: &str) -> Vec<ConnectionSender> {
        let ids: Vec<ConnectionId> = self
            .actors
            .get(user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| self.connections.get(&id).map(|entry| entry.tx.clone()))
            .collect()
    }

    /// Per-match multicast groups.
    pub fn topics(&self) -> &TopicGroups {
        &self.topics
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of distinct actors with at least one live connection.
    pub fn connected_users(&self) -> usize {
        self.actors.len()
    }
}
