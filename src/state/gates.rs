use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::dao::models::MatchId;

type GateMap = DashMap<MatchId, Arc<Mutex<()>>>;

/// Per-match async locks created on demand and dropped once nobody holds or awaits them.
#[derive(Default)]
pub struct MatchGates {
    gates: Arc<GateMap>,
}

/// Exclusive hold on one match's gate; released on drop.
pub struct MatchGuard {
    match_id: MatchId,
    guard: Option<OwnedMutexGuard<()>>,
    gates: Arc<GateMap>,
}

impl MatchGates {
    /// Wait for exclusive access to `match_id`.
    pub async fn acquire(&self, match_id: &str) -> MatchGuard {
        let gate = self.gates.entry(match_id.to_owned()).or_default().clone();
        let guard = gate.lock_owned().await;
        MatchGuard {
            match_id: match_id.to_owned(),
            guard: Some(guard),
            gates: self.gates.clone(),
        }
    }

    /// Number of gates currently allocated.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Whether no gate is allocated.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

impl Drop for MatchGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.gates
            .remove_if(&self.match_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}
