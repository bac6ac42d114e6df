//! Error types for security group reconciliation.

use thiserror::Error;

use crate::role::Role;

/// Configuration errors. These are never transient: retrying the same
/// configuration produces the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cluster name is required")]
    EmptyClusterName,

    #[error("rule {rule}: remoteGroupID must not be set when remoteManagedGroups is set")]
    MutuallyExclusiveRemote { rule: String },

    #[error("rule {rule}: remoteIPPrefix must not be combined with a remote group reference")]
    ConflictingRemotePrefix { rule: String },

    #[error("rule {rule}: one of remoteGroupID, remoteIPPrefix or remoteManagedGroups is required")]
    MissingRemoteReference { rule: String },

    #[error("remoteManagedGroups: {0} is not a valid remote managed security group")]
    UnknownManagedGroup(Role),

    #[error("no security group resolved for role {0}")]
    UnresolvedRole(Role),

    #[error("invalid port range: min ({0}) > max ({1})")]
    InvalidPortRange(u16, u16),

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),
}

/// Errors returned by the networking provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider API error: {0}")]
    Api(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("provider call {0} timed out")]
    Timeout(&'static str),
}

/// Errors surfaced by a reconciliation pass.
#[derive(Debug, Error)]
pub enum SecGroupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("more than one security group found named: {0}")]
    AmbiguousGroupName(String),

    #[error("security group {0} not found")]
    GroupNotFound(String),

    #[error("malformed rule {id} returned by provider: {reason}")]
    MalformedRule { id: String, reason: String },
}

impl SecGroupError {
    /// Configuration errors should not be retried by the caller.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SecGroupError::Config(_) | SecGroupError::AmbiguousGroupName(_)
        )
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, SecGroupError>;
