// XApp Endorsement Engine
// Error taxonomy
//
// Every EndorsementError is a precondition violation: the call that returned it
// left all engine state untouched and may be retried once the caller fixes the
// offending condition.

use crate::access_control::Role;
use crate::types::{Address, AppId, NodeId, RoundId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndorsementError {
    #[error("App not found: {0}")]
    NonexistentApp(AppId),

    #[error("App already endorsed: {0}")]
    AppAlreadyEndorsed(AppId),

    #[error("Caller {caller} is not the manager of node {node_id}")]
    NonNodeHolder { caller: Address, node_id: NodeId },

    #[error("Node {node_id} already endorses app {app_id}")]
    AlreadyEndorser { node_id: NodeId, app_id: AppId },

    #[error("Node {node_id} does not endorse app {app_id}")]
    NonEndorser { node_id: NodeId, app_id: AppId },

    #[error("Node {0} is in cooldown")]
    NodeCooldownActive(NodeId),

    #[error("Node {0} has a level that cannot endorse")]
    NodeNotAllowedToEndorse(NodeId),

    #[error("App is blacklisted: {0}")]
    AppBlacklisted(AppId),

    #[error("App was already included in an allocation round: {0}")]
    AlreadyIncluded(AppId),

    #[error("Invalid range: start {start}, count {count}, total {total}")]
    InvalidRange { start: usize, count: usize, total: usize },

    #[error("Caller {caller} lacks role {role:?}")]
    Unauthorized { caller: Address, role: Role },

    #[error("Caller {caller} is neither admin of app {app_id} nor a global admin")]
    NotAppAdmin { caller: Address, app_id: AppId },

    #[error("App already exists: {0}")]
    AppAlreadyExists(AppId),

    #[error("Invalid app name: {0:?}")]
    InvalidAppName(String),

    #[error("Round {requested} is not the current round {current}")]
    RoundMismatch { requested: RoundId, current: RoundId },
}

/// Result type for engine operations
pub type EndorsementResult<T> = Result<T, EndorsementError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
