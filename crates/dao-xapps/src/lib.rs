// XApp Endorsement Engine
// Node-backed endorsement, grace periods and allocation-round eligibility
pub mod types;
pub mod error;
pub mod score_table;
pub mod endorsement_ledger;
pub mod cooldown;
pub mod eligibility;
pub mod security_bridge;
pub mod access_control;
pub mod registry;
pub mod events;
pub mod round_gate;
pub mod collaborators;
pub mod config;
pub mod engine;


pub use types::{Address, AppId, Height, NodeId, NodeLevel, ParseIdError, RoundId, SecurityLevel};

pub use error::{ConfigError, EndorsementError, EndorsementResult};

pub use score_table::{ScoreTable, DEFAULT_LEVEL_POINTS, DEFAULT_SCORE_THRESHOLD};

pub use endorsement_ledger::EndorsementLedger;

pub use cooldown::CooldownTracker;

pub use eligibility::{
    AppEligibilityState, EndorsementStatus, GraceWindow, StatusChange, StatusKind,
    GRACE_PERIOD_FULL_ROUNDS,
};

pub use security_bridge::{LevelChange, SecurityBridge};

pub use access_control::{AccessControl, Role};

pub use registry::{XApp, XAppRegistry, MAX_APP_NAME_LEN};

pub use events::EndorsementEvent;

pub use round_gate::RoundSnapshots;

pub use collaborators::{
    InMemoryNodeLedger, InMemorySecurityNotifier, ManualRoundClock, NodeLedger, NodeRecord,
    RoundClock, SecurityNotifier,
};

pub use config::{EngineConfig, DEFAULT_COOLDOWN_PERIOD, DEFAULT_GRACE_PERIOD};

pub use engine::{AppSummary, XAppsEngine};
