//! Cloud networking provider interface.
//!
//! One call per logical operation. Implementations talk to the real cloud
//! API; [`memory::MemoryNetworking`] keeps everything in process.

pub mod memory;
pub mod timeout;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::rule::RuleSpec;

pub use memory::MemoryNetworking;
pub use timeout::TimeoutClient;

/// Resource kind used when tagging security groups.
pub const SECURITY_GROUP_RESOURCE: &str = "security-groups";

/// Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Filter for listing groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListGroupsFilter {
    pub name: String,
    pub project_id: Option<String>,
}

/// Security group as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rules: Vec<WireRule>,
}

/// Security group rule as returned by the provider.
///
/// Everything except the identifiers is optional on the wire; providers
/// report "unset" as either a missing field or an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRule {
    pub id: String,
    pub security_group_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub ether_type: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port_range_min: Option<u16>,
    #[serde(default)]
    pub port_range_max: Option<u16>,
    #[serde(default)]
    pub remote_group_id: Option<String>,
    #[serde(default)]
    pub remote_ip_prefix: Option<String>,
}

impl WireRule {
    /// Wire form of a resolved rule.
    pub fn from_rule(id: impl Into<String>, security_group_id: impl Into<String>, rule: &RuleSpec) -> Self {
        Self {
            id: id.into(),
            security_group_id: security_group_id.into(),
            description: rule.description.clone(),
            direction: Some(rule.direction.as_str().to_string()),
            ether_type: Some(rule.ether_type.as_str().to_string()),
            protocol: rule.protocol.as_ref().map(|p| p.as_str().to_string()),
            port_range_min: rule.port_range_min,
            port_range_max: rule.port_range_max,
            remote_group_id: rule.remote.group_id().map(str::to_string),
            remote_ip_prefix: rule.remote.ip_prefix().map(str::to_string),
        }
    }
}

/// Request to create a rule. The remote must already be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRuleRequest {
    pub security_group_id: String,
    pub rule: RuleSpec,
}

/// Networking capability consumed by the reconciler.
#[async_trait]
pub trait NetworkingClient: Send + Sync {
    async fn list_groups(&self, filter: &ListGroupsFilter) -> ProviderResult<Vec<WireGroup>>;

    async fn create_group(&self, name: &str, description: &str) -> ProviderResult<WireGroup>;

    /// Delete a group and, implicitly, its rules.
    async fn delete_group(&self, id: &str) -> ProviderResult<()>;

    async fn create_rule(&self, request: &CreateRuleRequest) -> ProviderResult<WireRule>;

    async fn delete_rule(&self, id: &str) -> ProviderResult<()>;

    async fn replace_tags(
        &self,
        resource_kind: &str,
        id: &str,
        tags: &[String],
    ) -> ProviderResult<()>;
}

#[async_trait]
impl<C: NetworkingClient + ?Sized> NetworkingClient for std::sync::Arc<C> {
    async fn list_groups(&self, filter: &ListGroupsFilter) -> ProviderResult<Vec<WireGroup>> {
        (**self).list_groups(filter).await
    }

    async fn create_group(&self, name: &str, description: &str) -> ProviderResult<WireGroup> {
        (**self).create_group(name, description).await
    }

    async fn delete_group(&self, id: &str) -> ProviderResult<()> {
        (**self).delete_group(id).await
    }

    async fn create_rule(&self, request: &CreateRuleRequest) -> ProviderResult<WireRule> {
        (**self).create_rule(request).await
    }

    async fn delete_rule(&self, id: &str) -> ProviderResult<()> {
        (**self).delete_rule(id).await
    }

    async fn replace_tags(
        &self,
        resource_kind: &str,
        id: &str,
        tags: &[String],
    ) -> ProviderResult<()> {
        (**self).replace_tags(resource_kind, id, tags).await
    }
}
