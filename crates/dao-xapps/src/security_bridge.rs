// XApp Endorsement Engine
// Security-Level Bridge - endorsement transitions to the external reputation signal
//
// SAFETY INVARIANTS:
// 1. Losing endorsement demotes to None but remembers the prior level
// 2. Regaining endorsement restores the remembered level, else bumps None to Low
// 3. A level other than None found on regain is left untouched
// 4. Repeated demotions never overwrite a remembered level with None

use crate::collaborators::SecurityNotifier;
use crate::types::{AppId, SecurityLevel};
use log::{debug, info};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

/// External level change performed by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub from: SecurityLevel,
    pub to: SecurityLevel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityBridge {
    /// Level observed right before the last demotion, per app
    remembered: BTreeMap<AppId, SecurityLevel>,
}

impl SecurityBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remembered_level(&self, app_id: &AppId) -> Option<SecurityLevel> {
        self.remembered.get(app_id).copied()
    }

    /// App reached or regained the threshold
    pub fn on_endorsed(&mut self, app_id: &AppId, notifier: &dyn SecurityNotifier) -> Option<LevelChange> {
        let current = SecurityLevel::from_raw(notifier.get_level(app_id));
        let remembered = self.remembered.remove(app_id);

        if current != SecurityLevel::None {
            debug!("Security level of {} left at {:?} on endorsement", app_id, current);
            return None;
        }

        let restored = match remembered {
            Some(level) if level != SecurityLevel::None => level,
            _ => SecurityLevel::Low,
        };
        notifier.set_level(app_id, restored.as_u8());
        info!("Security level of {} raised {:?} -> {:?}", app_id, current, restored);

        Some(LevelChange { from: current, to: restored })
    }

    /// App lost its endorsement (threshold loss or grace expiry)
    pub fn on_lost_endorsement(&mut self, app_id: &AppId, notifier: &dyn SecurityNotifier) -> Option<LevelChange> {
        let current = SecurityLevel::from_raw(notifier.get_level(app_id));
        if current == SecurityLevel::None {
            return None;
        }

        self.remembered.insert(*app_id, current);
        notifier.set_level(app_id, SecurityLevel::None.as_u8());
        info!("Security level of {} demoted {:?} -> None", app_id, current);

        Some(LevelChange { from: current, to: SecurityLevel::None })
    }

    pub fn forget(&mut self, app_id: &AppId) {
        self.remembered.remove(app_id);
    }
}
