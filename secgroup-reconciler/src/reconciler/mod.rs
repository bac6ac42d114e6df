//! Reconcilers for cluster resources.
//!
//! A reconciler compares the desired state derived from configuration with
//! the state observed in the provider and takes actions to converge.

pub mod rules;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::audit::ClusterAuditLogger;
use crate::config::ClusterConfig;
use crate::desired;
use crate::error::Result;
use crate::lifecycle::GroupLifecycle;
use crate::provider::NetworkingClient;
use crate::resolution::ResolutionTable;
use crate::role::Role;
use crate::status::{ClusterSecurityGroupStatus, GroupStatus};

pub use rules::{RulePlan, plan_rules, reconcile_group_rules};

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The desired configuration.
    type Spec;
    /// The status type to report back.
    type Status;

    /// Reconcile the resource - compare desired vs actual state and take action.
    async fn reconcile(&self, id: &str, spec: &Self::Spec) -> Result<Self::Status>;

    /// Handle resource deletion (finalization).
    async fn finalize(&self, id: &str, spec: &Self::Spec) -> Result<()>;
}

/// Keeps the managed security groups of one cluster convergent.
pub struct SecurityGroupReconciler {
    client: Arc<dyn NetworkingClient>,
    audit: ClusterAuditLogger,
}

impl SecurityGroupReconciler {
    pub fn new(client: Arc<dyn NetworkingClient>, audit: ClusterAuditLogger) -> Self {
        Self { client, audit }
    }

    fn lifecycle<'a>(&'a self, config: &'a ClusterConfig) -> GroupLifecycle<'a> {
        GroupLifecycle::new(
            self.client.as_ref(),
            &self.audit,
            config.project_id.as_deref(),
        )
    }

    async fn reconcile_groups(&self, config: &ClusterConfig) -> Result<ClusterSecurityGroupStatus> {
        config.validate()?;

        let lifecycle = self.lifecycle(config);
        let mut table = ResolutionTable::new();
        let mut observed: Vec<(Role, GroupStatus)> = Vec::new();

        for role in config.enabled_roles().iter() {
            let name = role.group_name(&config.name);
            let group = lifecycle.ensure_group(&name, &config.tags).await?;
            table.insert(role, group.id.clone());
            observed.push((role, group));
        }

        let groups = desired::generate(config, &table)?;

        let mut status = ClusterSecurityGroupStatus::default();
        for spec in &groups {
            let current = observed
                .iter()
                .position(|(role, _)| *role == spec.role)
                .map(|pos| observed.swap_remove(pos).1)
                .unwrap_or_default();

            let group_status = if current.exists() {
                reconcile_group_rules(self.client.as_ref(), spec, current).await?
            } else {
                GroupStatus::absent()
            };
            status.set(spec.role, group_status);
        }

        Ok(status)
    }
}

#[async_trait]
impl Reconciler for SecurityGroupReconciler {
    type Spec = ClusterConfig;
    type Status = ClusterSecurityGroupStatus;

    async fn reconcile(&self, id: &str, spec: &Self::Spec) -> Result<Self::Status> {
        if !spec.managed() {
            debug!(cluster = id, "Security groups are not managed, nothing to do");
            return Ok(ClusterSecurityGroupStatus::default());
        }

        info!(cluster = id, "Reconciling security groups");
        match self.reconcile_groups(spec).await {
            Ok(status) => Ok(status),
            Err(e) => {
                self.audit.reconcile_failed(&e);
                Err(e)
            }
        }
    }

    async fn finalize(&self, id: &str, spec: &Self::Spec) -> Result<()> {
        info!(cluster = id, "Deleting security groups");
        let lifecycle = self.lifecycle(spec);

        let mut roles = vec![Role::ControlPlane, Role::Worker];
        if spec.bastion_enabled() {
            roles.push(Role::Bastion);
        }
        for role in roles {
            lifecycle.delete_group(&role.group_name(&spec.name)).await?;
        }
        Ok(())
    }
}
