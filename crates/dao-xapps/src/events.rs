// XApp Endorsement Engine
// Event journal - typed record of every successful state transition

use crate::access_control::Role;
use crate::eligibility::{GraceWindow, StatusKind};
use crate::security_bridge::LevelChange;
use crate::types::{Address, AppId, Height, NodeId, NodeLevel, RoundId};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndorsementEvent {
    AppSubmitted {
        app_id: AppId,
        name: String,
        admin: Address,
    },
    AppEndorsed {
        app_id: AppId,
        node_id: NodeId,
        manager: Address,
        score: u64,
    },
    AppUnendorsed {
        app_id: AppId,
        node_id: NodeId,
        manager: Address,
        score: u64,
    },
    EndorsementRemovedByAdmin {
        app_id: AppId,
        node_id: NodeId,
        admin: Address,
        score: u64,
    },
    /// Binding dropped during reconciliation because the node can no longer endorse
    EndorsementPruned {
        app_id: AppId,
        node_id: NodeId,
    },
    EndorsementStatusChanged {
        app_id: AppId,
        from: StatusKind,
        to: StatusKind,
        score: u64,
    },
    GracePeriodStarted {
        app_id: AppId,
        window: GraceWindow,
    },
    GracePeriodExpired {
        app_id: AppId,
        window: GraceWindow,
    },
    VotingEligibilityUpdated {
        app_id: AppId,
        eligible: bool,
    },
    SecurityLevelChanged {
        app_id: AppId,
        change: LevelChange,
    },
    ScoreTableUpdated {
        points: BTreeMap<NodeLevel, u64>,
    },
    ThresholdUpdated {
        old: u64,
        new: u64,
    },
    GracePeriodUpdated {
        old: Height,
        new: Height,
    },
    CooldownPeriodUpdated {
        old: u64,
        new: u64,
    },
    SubmissionRemoved {
        app_id: AppId,
        freed_nodes: Vec<NodeId>,
    },
    AppAdminUpdated {
        app_id: AppId,
        old: Address,
        new: Address,
    },
    RoleGranted {
        role: Role,
        account: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
    },
    RoundSnapshotTaken {
        round_id: RoundId,
        eligible_apps: usize,
    },
}

impl EndorsementEvent {
    /// App the event concerns, if it concerns a single app
    pub fn app_id(&self) -> Option<&AppId> {
        match self {
            EndorsementEvent::AppSubmitted { app_id, .. }
            | EndorsementEvent::AppEndorsed { app_id, .. }
            | EndorsementEvent::AppUnendorsed { app_id, .. }
            | EndorsementEvent::EndorsementRemovedByAdmin { app_id, .. }
            | EndorsementEvent::EndorsementPruned { app_id, .. }
            | EndorsementEvent::EndorsementStatusChanged { app_id, .. }
            | EndorsementEvent::GracePeriodStarted { app_id, .. }
            | EndorsementEvent::GracePeriodExpired { app_id, .. }
            | EndorsementEvent::VotingEligibilityUpdated { app_id, .. }
            | EndorsementEvent::SecurityLevelChanged { app_id, .. }
            | EndorsementEvent::SubmissionRemoved { app_id, .. }
            | EndorsementEvent::AppAdminUpdated { app_id, .. } => Some(app_id),
            _ => None,
        }
    }
}
