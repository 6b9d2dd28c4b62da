// XApp Endorsement Engine
// Access control - global roles

use crate::error::{EndorsementError, EndorsementResult};
use crate::types::Address;
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Global admin: manages roles, moderates any app
    Admin,

    /// Governance executor: owns configuration and voting eligibility
    Governance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// Access control with a single address holding both roles
    pub fn with_admin(admin: Address) -> Self {
        let mut acl = AccessControl::default();
        acl.grant(Role::Admin, admin);
        acl.grant(Role::Governance, admin);
        acl
    }

    pub fn has_role(&self, role: Role, who: &Address) -> bool {
        self.members.get(&role).map_or(false, |m| m.contains(who))
    }

    pub fn ensure(&self, role: Role, caller: &Address) -> EndorsementResult<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(EndorsementError::Unauthorized { caller: *caller, role })
        }
    }

    /// Returns false if `who` already held the role
    pub fn grant(&mut self, role: Role, who: Address) -> bool {
        self.members.entry(role).or_default().insert(who)
    }

    /// Returns false if `who` did not hold the role
    pub fn revoke(&mut self, role: Role, who: &Address) -> bool {
        self.members.get_mut(&role).map_or(false, |m| m.remove(who))
    }
}
