// XApp Endorsement Engine
// Cooldown Tracker - per-node last action round
//
// INVARIANTS:
// 1. Only the round of the last action is stored per node, never the period
// 2. Cooldown status is recomputed against the period passed in at query time,
//    so a period change applies retroactively to every node at once
// 3. A period of 0 disables cooldown entirely

use crate::types::{NodeId, RoundId};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooldownTracker {
    last_action_round: BTreeMap<NodeId, RoundId>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `node_id` endorsed or unendorsed during `round`
    pub fn record_action(&mut self, node_id: NodeId, round: RoundId) {
        self.last_action_round.insert(node_id, round);
    }

    pub fn last_action_round(&self, node_id: NodeId) -> Option<RoundId> {
        self.last_action_round.get(&node_id).copied()
    }

    /// Whether `node_id` is cooling down at `current_round` under `period_rounds`
    pub fn is_cooling_down(&self, node_id: NodeId, current_round: RoundId, period_rounds: u64) -> bool {
        if period_rounds == 0 {
            return false;
        }

        match self.last_action_round.get(&node_id) {
            Some(last) => current_round.saturating_sub(*last) < period_rounds,
            None => false,
        }
    }

    /// Rounds left until `node_id` may act again; 0 when free
    pub fn remaining_rounds(&self, node_id: NodeId, current_round: RoundId, period_rounds: u64) -> u64 {
        if !self.is_cooling_down(node_id, current_round, period_rounds) {
            return 0;
        }

        let last = self.last_action_round.get(&node_id).copied().unwrap_or(current_round);
        period_rounds.saturating_sub(current_round.saturating_sub(last))
    }
}
