// XApp Endorsement Engine
// Round gate - per-round snapshot of eligible apps
//
// SAFETY INVARIANTS:
// 1. A round is snapshotted at most once; the first snapshot governs the
//    whole round even if an app's eligibility changes mid-round
// 2. Snapshots are never edited after they are taken

use crate::types::{AppId, RoundId};
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundSnapshots {
    snapshots: BTreeMap<RoundId, BTreeSet<AppId>>,
}

impl RoundSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the eligible set of `round_id`. Returns false if the round
    /// already had a snapshot, in which case nothing changes.
    pub fn record(&mut self, round_id: RoundId, eligible: BTreeSet<AppId>) -> bool {
        if self.snapshots.contains_key(&round_id) {
            return false;
        }
        self.snapshots.insert(round_id, eligible);
        true
    }

    pub fn apps(&self, round_id: RoundId) -> Option<&BTreeSet<AppId>> {
        self.snapshots.get(&round_id)
    }

    pub fn is_eligible_for_vote(&self, app_id: &AppId, round_id: RoundId) -> bool {
        self.snapshots
            .get(&round_id)
            .map_or(false, |apps| apps.contains(app_id))
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<(RoundId, &BTreeSet<AppId>)> {
        self.snapshots.iter().next_back().map(|(round, apps)| (*round, apps))
    }
}
