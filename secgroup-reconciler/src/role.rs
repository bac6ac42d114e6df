//! Logical security group roles and group naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SEC_GROUP_PREFIX: &str = "k8s";

/// A named slot in the cluster's security topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ControlPlane,
    Worker,
    Bastion,
}

impl Role {
    /// All roles in reconciliation order.
    pub const ALL: [Role; 3] = [Role::ControlPlane, Role::Worker, Role::Bastion];

    /// Suffix used in the provider-side group name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Role::ControlPlane => "controlplane",
            Role::Worker => "worker",
            Role::Bastion => "bastion",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ControlPlane => "control-plane",
            Role::Worker => "worker",
            Role::Bastion => "bastion",
        }
    }

    /// Peer role for in-cluster traffic rules. Bastion has no peer.
    pub fn peer(&self) -> Option<Role> {
        match self {
            Role::ControlPlane => Some(Role::Worker),
            Role::Worker => Some(Role::ControlPlane),
            Role::Bastion => None,
        }
    }

    /// Deterministic group name for this role in the given cluster.
    pub fn group_name(&self, cluster_name: &str) -> String {
        format!(
            "{}-cluster-{}-secgroup-{}",
            SEC_GROUP_PREFIX,
            cluster_name,
            self.suffix()
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "control-plane" | "controlplane" => Ok(Role::ControlPlane),
            "worker" => Ok(Role::Worker),
            "bastion" => Ok(Role::Bastion),
            other => Err(format!("unknown security group role: {}", other)),
        }
    }
}

/// Set of roles enabled by the current configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet {
    control_plane: bool,
    worker: bool,
    bastion: bool,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    pub fn insert(&mut self, role: Role) {
        match role {
            Role::ControlPlane => self.control_plane = true,
            Role::Worker => self.worker = true,
            Role::Bastion => self.bastion = true,
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::ControlPlane => self.control_plane,
            Role::Worker => self.worker,
            Role::Bastion => self.bastion,
        }
    }

    /// Enabled roles in reconciliation order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.contains(*r))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_names_are_distinct_per_role() {
        let names: Vec<String> = Role::ALL.iter().map(|r| r.group_name("prod")).collect();
        assert_eq!(names[0], "k8s-cluster-prod-secgroup-controlplane");
        assert_eq!(names[1], "k8s-cluster-prod-secgroup-worker");
        assert_eq!(names[2], "k8s-cluster-prod-secgroup-bastion");
    }

    #[test]
    fn test_role_set_iterates_in_role_order() {
        let set = RoleSet::new().with(Role::Bastion).with(Role::ControlPlane);
        let roles: Vec<Role> = set.iter().collect();
        assert_eq!(roles, vec![Role::ControlPlane, Role::Bastion]);
        assert!(!set.contains(Role::Worker));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("controlplane".parse::<Role>().unwrap(), Role::ControlPlane);
        assert_eq!("bastion".parse::<Role>().unwrap(), Role::Bastion);
        assert!("allNodes".parse::<Role>().is_err());
    }
}
