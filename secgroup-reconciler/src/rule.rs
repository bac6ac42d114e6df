//! Rule value model.
//!
//! A rule is a value: two rules are the same rule when all of their fields
//! match, regardless of any identifier the provider assigned.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Traffic direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ingress => "ingress",
            Direction::Egress => "egress",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingress" => Ok(Direction::Ingress),
            "egress" => Ok(Direction::Egress),
            other => Err(format!("invalid direction: {:?}", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP version a rule applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EtherType {
    #[default]
    IPv4,
    IPv6,
}

impl EtherType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EtherType::IPv4 => "IPv4",
            EtherType::IPv6 => "IPv6",
        }
    }
}

impl FromStr for EtherType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IPv4" => Ok(EtherType::IPv4),
            "IPv6" => Ok(EtherType::IPv6),
            other => Err(format!("invalid ether type: {:?}", other)),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP protocol. Anything the provider accepts that is not one of the common
/// names is carried verbatim, e.g. `"4"` for IP-in-IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Ipv6Icmp,
    Other(String),
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Ipv6Icmp => "ipv6-icmp",
            Protocol::Other(p) => p,
        }
    }
}

impl From<String> for Protocol {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            "icmp" => Protocol::Icmp,
            "ipv6-icmp" => Protocol::Ipv6Icmp,
            _ => Protocol::Other(s),
        }
    }
}

impl From<&str> for Protocol {
    fn from(s: &str) -> Self {
        Protocol::from(s.to_string())
    }
}

impl From<Protocol> for String {
    fn from(p: Protocol) -> String {
        p.as_str().to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote endpoint of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum RemoteRef {
    /// Match any source/destination.
    #[default]
    Any,
    /// Another security group, by provider ID.
    Group(String),
    /// A CIDR prefix.
    Prefix(String),
    /// The group the rule belongs to. Only valid in desired rules.
    SelfGroup,
}

impl RemoteRef {
    pub fn group_id(&self) -> Option<&str> {
        match self {
            RemoteRef::Group(id) => Some(id),
            _ => None,
        }
    }

    pub fn ip_prefix(&self) -> Option<&str> {
        match self {
            RemoteRef::Prefix(p) => Some(p),
            _ => None,
        }
    }
}

/// One firewall rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub direction: Direction,
    pub ether_type: EtherType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range_min: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range_max: Option<u16>,
    #[serde(default)]
    pub remote: RemoteRef,
}

impl RuleSpec {
    /// Start a rule with no protocol, ports or remote restriction.
    pub fn new(direction: Direction, ether_type: EtherType) -> Self {
        Self {
            description: None,
            direction,
            ether_type,
            protocol: None,
            port_range_min: None,
            port_range_max: None,
            remote: RemoteRef::Any,
        }
    }

    pub fn ingress() -> Self {
        Self::new(Direction::Ingress, EtherType::IPv4)
    }

    pub fn egress(ether_type: EtherType) -> Self {
        Self::new(Direction::Egress, ether_type)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn protocol(mut self, protocol: impl Into<Protocol>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(Protocol::Tcp)
    }

    pub fn port(self, port: u16) -> Self {
        self.ports(port, port)
    }

    pub fn ports(mut self, min: u16, max: u16) -> Self {
        self.port_range_min = Some(min);
        self.port_range_max = Some(max);
        self
    }

    pub fn remote(mut self, remote: RemoteRef) -> Self {
        self.remote = remote;
        self
    }

    pub fn from_self(self) -> Self {
        self.remote(RemoteRef::SelfGroup)
    }

    pub fn from_group(self, id: impl Into<String>) -> Self {
        self.remote(RemoteRef::Group(id.into()))
    }

    /// Replace a self-reference with the concrete ID of the owning group.
    pub fn resolve_self(&self, group_id: &str) -> RuleSpec {
        let mut rule = self.clone();
        if rule.remote == RemoteRef::SelfGroup {
            rule.remote = RemoteRef::Group(group_id.to_string());
        }
        rule
    }
}

/// An observed rule: a rule value plus the identifier the provider assigned.
///
/// Serialized flat, with the remote as `remoteGroupID` or `remoteIPPrefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RuleStatusFields", from = "RuleStatusFields")]
pub struct RuleStatus {
    pub id: String,
    pub rule: RuleSpec,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleStatusFields {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    direction: Direction,
    #[serde(default)]
    ether_type: EtherType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port_range_min: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port_range_max: Option<u16>,
    #[serde(default, rename = "remoteGroupID", skip_serializing_if = "Option::is_none")]
    remote_group_id: Option<String>,
    #[serde(default, rename = "remoteIPPrefix", skip_serializing_if = "Option::is_none")]
    remote_ip_prefix: Option<String>,
}

impl From<RuleStatus> for RuleStatusFields {
    fn from(status: RuleStatus) -> Self {
        let RuleStatus { id, rule } = status;
        // Observed rules never carry SelfGroup.
        let remote_group_id = rule.remote.group_id().map(str::to_string);
        let remote_ip_prefix = rule.remote.ip_prefix().map(str::to_string);
        Self {
            id,
            description: rule.description,
            direction: rule.direction,
            ether_type: rule.ether_type,
            protocol: rule.protocol,
            port_range_min: rule.port_range_min,
            port_range_max: rule.port_range_max,
            remote_group_id,
            remote_ip_prefix,
        }
    }
}

impl From<RuleStatusFields> for RuleStatus {
    fn from(fields: RuleStatusFields) -> Self {
        let remote = match (fields.remote_group_id, fields.remote_ip_prefix) {
            (Some(group), _) => RemoteRef::Group(group),
            (None, Some(prefix)) => RemoteRef::Prefix(prefix),
            (None, None) => RemoteRef::Any,
        };
        Self {
            id: fields.id,
            rule: RuleSpec {
                description: fields.description,
                direction: fields.direction,
                ether_type: fields.ether_type,
                protocol: fields.protocol,
                port_range_min: fields.port_range_min,
                port_range_max: fields.port_range_max,
                remote,
            },
        }
    }
}

/// Whether `observed` already satisfies `desired` for a group with ID `self_id`.
///
/// Provider-assigned IDs never take part in the comparison.
pub fn matches(desired: &RuleSpec, observed: &RuleStatus, self_id: &str) -> bool {
    desired.resolve_self(self_id) == observed.rule
}
