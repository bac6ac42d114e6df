//! Role to provider group ID table.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::role::{Role, RoleSet};

/// Maps logical roles to the provider IDs of their groups.
///
/// Populated while groups are ensured, before desired rules are generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionTable {
    ids: BTreeMap<Role, String>,
}

impl ResolutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role, id: impl Into<String>) {
        self.ids.insert(role, id.into());
    }

    /// Provider ID for `role`. A missing role is a configuration error.
    pub fn get(&self, role: Role) -> Result<&str, ConfigError> {
        self.ids
            .get(&role)
            .map(String::as_str)
            .ok_or(ConfigError::UnresolvedRole(role))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.ids.contains_key(&role)
    }

    /// Roles that have been resolved.
    pub fn roles(&self) -> RoleSet {
        self.ids.keys().fold(RoleSet::new(), |set, r| set.with(*r))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.ids.iter().map(|(r, id)| (*r, id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_role_is_config_error() {
        let mut table = ResolutionTable::new();
        table.insert(Role::ControlPlane, "sg-cp");

        assert_eq!(table.get(Role::ControlPlane).unwrap(), "sg-cp");
        assert_eq!(
            table.get(Role::Bastion),
            Err(ConfigError::UnresolvedRole(Role::Bastion))
        );
        assert_eq!(table.roles(), RoleSet::new().with(Role::ControlPlane));
    }
}
