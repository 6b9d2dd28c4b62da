// XApp Endorsement Engine
// App registry - the minimal submission record the engine depends on

use crate::error::{EndorsementError, EndorsementResult};
use crate::types::{Address, AppId, RoundId};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

/// Upper bound on app name length, in bytes
pub const MAX_APP_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XApp {
    pub id: AppId,
    pub name: String,
    pub admin: Address,
    pub team_wallet: Address,
    pub metadata_uri: String,
    /// Round during which the app was submitted
    pub submitted_round: RoundId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XAppRegistry {
    apps: BTreeMap<AppId, XApp>,
}

impl XAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, app_id: &AppId) -> Option<&XApp> {
        self.apps.get(app_id)
    }

    pub fn ensure_exists(&self, app_id: &AppId) -> EndorsementResult<&XApp> {
        self.apps
            .get(app_id)
            .ok_or(EndorsementError::NonexistentApp(*app_id))
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AppId> {
        self.apps.keys()
    }

    /// Validate a submission without recording it
    pub fn check_submission(&self, name: &str) -> EndorsementResult<AppId> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.len() != name.len() || name.len() > MAX_APP_NAME_LEN {
            return Err(EndorsementError::InvalidAppName(name.to_string()));
        }

        let id = AppId::from_name(name);
        if self.apps.contains_key(&id) {
            return Err(EndorsementError::AppAlreadyExists(id));
        }
        Ok(id)
    }

    pub fn insert(&mut self, app: XApp) {
        self.apps.insert(app.id, app);
    }

    pub fn remove(&mut self, app_id: &AppId) -> Option<XApp> {
        self.apps.remove(app_id)
    }

    pub fn set_admin(&mut self, app_id: &AppId, admin: Address) -> EndorsementResult<Address> {
        let app = self
            .apps
            .get_mut(app_id)
            .ok_or(EndorsementError::NonexistentApp(*app_id))?;
        Ok(std::mem::replace(&mut app.admin, admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> XApp {
        XApp {
            id: AppId::from_name(name),
            name: name.to_string(),
            admin: Address::repeat_byte(1),
            team_wallet: Address::repeat_byte(2),
            metadata_uri: "ipfs://meta".to_string(),
            submitted_round: 0,
        }
    }

    #[test]
    fn test_submission_checks() {
        let mut registry = XAppRegistry::new();
        assert_eq!(registry.check_submission("Mugshot"), Ok(AppId::from_name("Mugshot")));

        registry.insert(sample("Mugshot"));
        assert_eq!(
            registry.check_submission("Mugshot"),
            Err(EndorsementError::AppAlreadyExists(AppId::from_name("Mugshot")))
        );
        assert!(matches!(registry.check_submission(""), Err(EndorsementError::InvalidAppName(_))));
        assert!(matches!(registry.check_submission(" padded "), Err(EndorsementError::InvalidAppName(_))));
        assert!(matches!(
            registry.check_submission(&"x".repeat(MAX_APP_NAME_LEN + 1)),
            Err(EndorsementError::InvalidAppName(_))
        ));
    }

    #[test]
    fn test_set_admin() {
        let mut registry = XAppRegistry::new();
        let app = sample("Mugshot");
        let id = app.id;
        registry.insert(app);

        let previous = registry.set_admin(&id, Address::repeat_byte(9)).unwrap();
        assert_eq!(previous, Address::repeat_byte(1));
        assert_eq!(registry.get(&id).unwrap().admin, Address::repeat_byte(9));
    }

    #[test]
    fn test_missing_app() {
        let registry = XAppRegistry::new();
        let id = AppId::from_name("ghost");
        assert_eq!(registry.ensure_exists(&id).err(), Some(EndorsementError::NonexistentApp(id)));
    }
}
