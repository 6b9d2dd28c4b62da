// XApp Endorsement Engine
// Engine configuration
//
// Loaded once from YAML at start-up. Afterwards every value here is owned by
// governance and changed only through the engine's update calls, which apply
// immediately to all apps and nodes.

use crate::error::ConfigError;
use crate::score_table::ScoreTable;
use crate::types::Height;
use log::info;
use serde::{Serialize, Deserialize};
use std::path::Path;

/// Two weekly rounds of 10-second blocks
pub const DEFAULT_GRACE_PERIOD: Height = 120_960;

/// Rounds a node must wait between endorsement actions
pub const DEFAULT_COOLDOWN_PERIOD: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub score_table: ScoreTable,

    /// Grace window length in heights
    pub grace_period: Height,

    /// Cooldown length in rounds; 0 disables cooldown
    pub cooldown_period: u64,

    /// Reconcile every app before a round snapshot is taken
    pub reconcile_on_round_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            score_table: ScoreTable::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            cooldown_period: DEFAULT_COOLDOWN_PERIOD,
            reconcile_on_round_start: false,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&raw)?;

        info!(
            "Loaded engine config from {} (threshold {}, grace {}, cooldown {})",
            path.display(),
            config.score_table.threshold,
            config.grace_period,
            config.cooldown_period
        );
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configurations the engine cannot run under
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.score_table.threshold == 0 {
            return Err(ConfigError::Invalid("threshold must be > 0".to_string()));
        }

        if !self.score_table.points.values().any(|p| *p > 0) {
            return Err(ConfigError::Invalid(
                "score table must give points to at least one level".to_string(),
            ));
        }

        if self.score_table.points_for(0) > 0 {
            return Err(ConfigError::Invalid("level 0 must score 0".to_string()));
        }

        Ok(())
    }
}
