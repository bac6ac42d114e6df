//! Cluster configuration consumed by the reconciler.
//!
//! This is read-only input. Validation happens before any provider call so a
//! bad configuration never leaves half-created groups behind.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::role::{Role, RoleSet};
use crate::rule::{Direction, EtherType, Protocol};

/// Security-relevant slice of a cluster's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Cluster name, used to derive group names.
    pub name: String,

    /// Project that owns the groups. Lookups are scoped to it when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Managed security groups. `None` disables group management entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_security_groups: Option<ManagedSecurityGroups>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion: Option<BastionConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_load_balancer: Option<ApiServerLoadBalancer>,

    /// Tags applied to groups when they are created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSecurityGroups {
    /// Permit all traffic between cluster nodes instead of the narrow allow-list.
    #[serde(default)]
    pub allow_all_in_cluster_traffic: bool,

    /// Rules added to both the control-plane and the worker group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_nodes_security_group_rules: Vec<RuleTemplate>,
}

impl ManagedSecurityGroups {
    /// BGP and IP-in-IP rules between all cluster nodes, as required by Calico.
    ///
    /// Older configurations got these implicitly; newer ones must list them.
    pub fn legacy_calico_rules() -> Vec<RuleTemplate> {
        let peers = vec![Role::ControlPlane, Role::Worker];
        vec![
            RuleTemplate {
                name: "BGP (calico)".to_string(),
                description: Some("BGP (calico)".to_string()),
                direction: Direction::Ingress,
                ether_type: Some(EtherType::IPv4),
                protocol: Some(Protocol::Tcp),
                port_range_min: Some(179),
                port_range_max: Some(179),
                remote_managed_groups: peers.clone(),
                ..Default::default()
            },
            RuleTemplate {
                name: "IP-in-IP (calico)".to_string(),
                description: Some("IP-in-IP (calico)".to_string()),
                direction: Direction::Ingress,
                ether_type: Some(EtherType::IPv4),
                protocol: Some(Protocol::Other("4".to_string())),
                remote_managed_groups: peers,
                ..Default::default()
            },
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BastionConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerLoadBalancer {
    #[serde(default)]
    pub enabled: bool,

    /// Extra ports exposed on the load balancer, opened on the control plane.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_ports: Vec<u16>,
}

/// Caller-supplied rule added to every node.
///
/// The remote side is exactly one of a direct group ID, a CIDR prefix, or a
/// set of managed roles. A set of N roles expands into N concrete rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTemplate {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub direction: Direction,

    /// Defaults to IPv4 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ether_type: Option<EtherType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range_min: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range_max: Option<u16>,

    #[serde(default, rename = "remoteGroupID", skip_serializing_if = "Option::is_none")]
    pub remote_group_id: Option<String>,

    #[serde(default, rename = "remoteIPPrefix", skip_serializing_if = "Option::is_none")]
    pub remote_ip_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_managed_groups: Vec<Role>,
}

impl Default for RuleTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            direction: Direction::Ingress,
            ether_type: None,
            protocol: None,
            port_range_min: None,
            port_range_max: None,
            remote_group_id: None,
            remote_ip_prefix: None,
            remote_managed_groups: Vec::new(),
        }
    }
}

impl RuleTemplate {
    /// Name used in error messages: the template name, or `#<index>` when unnamed.
    pub fn label(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("#{}", index)
        } else {
            self.name.clone()
        }
    }

    /// Direct remote group ID. An empty string counts as unset.
    pub fn remote_group(&self) -> Option<&str> {
        non_empty(&self.remote_group_id)
    }

    /// Remote CIDR prefix. An empty string counts as unset.
    pub fn remote_prefix(&self) -> Option<&str> {
        non_empty(&self.remote_ip_prefix)
    }

    /// Check the template in isolation and against the enabled roles.
    ///
    /// `index` identifies unnamed templates in error messages.
    pub fn validate(&self, index: usize, roles: RoleSet) -> Result<(), ConfigError> {
        let has_managed = !self.remote_managed_groups.is_empty();
        let group = self.remote_group();
        let prefix = self.remote_prefix();

        if has_managed && group.is_some() {
            return Err(ConfigError::MutuallyExclusiveRemote {
                rule: self.label(index),
            });
        }
        if prefix.is_some() && (has_managed || group.is_some()) {
            return Err(ConfigError::ConflictingRemotePrefix {
                rule: self.label(index),
            });
        }
        if !has_managed && group.is_none() && prefix.is_none() {
            return Err(ConfigError::MissingRemoteReference {
                rule: self.label(index),
            });
        }

        for role in &self.remote_managed_groups {
            if !roles.contains(*role) {
                return Err(ConfigError::UnknownManagedGroup(*role));
            }
        }

        if let Some(prefix) = prefix {
            prefix
                .parse::<IpNet>()
                .map_err(|_| ConfigError::InvalidCidr(prefix.to_string()))?;
        }

        validate_port_range(self.port_range_min, self.port_range_max)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn validate_port_range(min: Option<u16>, max: Option<u16>) -> Result<(), ConfigError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ConfigError::InvalidPortRange(min, max)),
        _ => Ok(()),
    }
}

impl ClusterConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn managed(&self) -> bool {
        self.managed_security_groups.is_some()
    }

    pub fn bastion_enabled(&self) -> bool {
        self.bastion.as_ref().is_some_and(|b| b.enabled)
    }

    pub fn allow_all_in_cluster_traffic(&self) -> bool {
        self.managed_security_groups
            .as_ref()
            .is_some_and(|m| m.allow_all_in_cluster_traffic)
    }

    /// Additional load balancer ports, empty unless the load balancer is enabled.
    pub fn additional_ports(&self) -> &[u16] {
        match &self.api_server_load_balancer {
            Some(lb) if lb.enabled => &lb.additional_ports,
            _ => &[],
        }
    }

    pub fn all_nodes_rules(&self) -> &[RuleTemplate] {
        self.managed_security_groups
            .as_ref()
            .map(|m| m.all_nodes_security_group_rules.as_slice())
            .unwrap_or_default()
    }

    /// Roles whose groups should exist. Empty when groups are not managed.
    pub fn enabled_roles(&self) -> RoleSet {
        if !self.managed() {
            return RoleSet::new();
        }
        let roles = RoleSet::new().with(Role::ControlPlane).with(Role::Worker);
        if self.bastion_enabled() {
            roles.with(Role::Bastion)
        } else {
            roles
        }
    }

    /// Validate everything that can be checked without the provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyClusterName);
        }
        let roles = self.enabled_roles();
        for (i, template) in self.all_nodes_rules().iter().enumerate() {
            template.validate(i, roles)?;
        }
        Ok(())
    }
}
