//! Security group reconciliation for provisioned clusters.
//!
//! Each cluster owns up to three security groups: control-plane, worker and
//! an optional bastion. [`SecurityGroupReconciler`] makes sure they exist and
//! hold exactly the rules implied by a [`ClusterConfig`]. A pass is safe to
//! repeat after any failure; it converges again from whatever state the
//! provider was left in.

pub mod audit;
pub mod config;
pub mod desired;
pub mod error;
pub mod lifecycle;
pub mod observed;
pub mod provider;
pub mod reconciler;
pub mod resolution;
pub mod role;
pub mod rule;
pub mod status;
pub mod templates;

pub use audit::ClusterAuditLogger;
pub use config::ClusterConfig;
pub use error::{ConfigError, ProviderError, Result, SecGroupError};
pub use provider::{MemoryNetworking, NetworkingClient, TimeoutClient};
pub use reconciler::{Reconciler, SecurityGroupReconciler};
pub use role::Role;
pub use rule::{RemoteRef, RuleSpec};
pub use status::{ClusterSecurityGroupStatus, GroupStatus};
