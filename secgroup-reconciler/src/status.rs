//! Observed group state, written back as cluster status.

use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::rule::RuleStatus;

/// Observed state of one security group.
///
/// An empty `id` means the group does not exist, or was reconciled down to
/// zero rules. Both are rendered the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatus {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleStatus>,
}

impl GroupStatus {
    /// The "absent" sentinel.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Status of all managed groups of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecurityGroupStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_security_group: Option<GroupStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_security_group: Option<GroupStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion_security_group: Option<GroupStatus>,
}

impl ClusterSecurityGroupStatus {
    pub fn get(&self, role: Role) -> Option<&GroupStatus> {
        match role {
            Role::ControlPlane => self.control_plane_security_group.as_ref(),
            Role::Worker => self.worker_security_group.as_ref(),
            Role::Bastion => self.bastion_security_group.as_ref(),
        }
    }

    pub fn set(&mut self, role: Role, status: GroupStatus) {
        let slot = match role {
            Role::ControlPlane => &mut self.control_plane_security_group,
            Role::Worker => &mut self.worker_security_group,
            Role::Bastion => &mut self.bastion_security_group,
        };
        *slot = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSpec;

    #[test]
    fn test_status_serializes_camel_case() {
        let mut status = ClusterSecurityGroupStatus::default();
        status.set(
            Role::ControlPlane,
            GroupStatus {
                id: "sg-1".to_string(),
                name: "k8s-cluster-a-secgroup-controlplane".to_string(),
                rules: vec![RuleStatus {
                    id: "r-1".to_string(),
                    rule: RuleSpec::ingress()
                        .description("SSH")
                        .tcp()
                        .port(22)
                        .from_group("sg-bastion"),
                }],
            },
        );

        let json = serde_json::to_value(&status).unwrap();
        let group = &json["controlPlaneSecurityGroup"];
        assert_eq!(group["id"], "sg-1");
        assert_eq!(group["rules"][0]["id"], "r-1");
        assert_eq!(group["rules"][0]["portRangeMin"], 22);
        assert_eq!(group["rules"][0]["etherType"], "IPv4");
        assert_eq!(group["rules"][0]["remoteGroupID"], "sg-bastion");
        assert!(json.get("bastionSecurityGroup").is_none());

        let back: ClusterSecurityGroupStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_absent_status() {
        assert!(!GroupStatus::absent().exists());
    }
}
