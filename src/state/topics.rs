use std::collections::HashMap;

use axum::extract::ws::Message;
use dashmap::DashMap;

use super::registry::{ConnectionId, ConnectionSender};
use crate::dao::models::MatchId;

/// Per-match multicast groups holding the outbound sender of every member.
///
/// Each group is guarded by its own map entry, so fan-out to one match never
/// blocks joins, leaves or fan-out on another.
#[derive(Default)]
pub struct TopicGroups {
    groups: DashMap<MatchId, HashMap<ConnectionId, ConnectionSender>>,
}

impl TopicGroups {
    /// Add a member; `greeting` is queued to the member before the group is released,
    /// so it always precedes any event published afterwards.
    pub(crate) fn insert_member(
        &self,
        match_id: &str,
        connection_id: ConnectionId,
        tx: ConnectionSender,
        greeting: Option<Message>,
    ) -> bool {
        let mut group = self.groups.entry(match_id.to_owned()).or_default();
        if let Some(frame) = greeting {
            let _ = tx.send(frame);
        }
        group.insert(connection_id, tx).is_none()
    }

    /// Remove a member, dropping the group once it is empty.
    pub(crate) fn remove_member(&self, match_id: &str, connection_id: ConnectionId) -> bool {
        let removed = match self.groups.get_mut(match_id) {
            Some(mut group) => group.remove(&connection_id).is_some(),
            None => false,
        };
        self.groups.remove_if(match_id, |_, group| group.is_empty());
        removed
    }

    /// Queue `frame` to every current member except `exclude`; returns the number of recipients.
    pub fn publish(&self, match_id: &str, frame: &Message, exclude: Option<ConnectionId>) -> usize {
        // Exclusive access keeps publishes to the same match in call order.
        let Some(group) = self.groups.get_mut(match_id) else {
            return 0;
        };

        group
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter(|(_, tx)| tx.send(frame.clone()).is_ok())
            .count()
    }

    /// Current members of a match group.
    pub fn members(&self, match_id: &str) -> Vec<ConnectionId> {
        self.groups
            .get(match_id)
            .map(|group| group.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the connection belongs to the match group.
    pub fn is_member(&self, match_id: &str, connection_id: ConnectionId) -> bool {
        self.groups
            .get(match_id)
            .is_some_and(|group| group.contains_key(&connection_id))
    }

    /// Number of members of a match group.
    pub fn member_count(&self, match_id: &str) -> usize {
        self.groups.get(match_id).map(|group| group.len()).unwrap_or(0)
    }

    /// Number of matches with at least one member.
    pub fn active_topics(&self) -> usize {
        self.groups.len()
    }

    /// Sum of memberships across every group.
    pub fn subscription_total(&self) -> usize {
        self.groups.iter().map(|group| group.len()).sum()
    }
}
