//! Group lifecycle: create-if-absent and delete-if-present.

use tracing::{debug, info};

use crate::audit::ClusterAuditLogger;
use crate::error::Result;
use crate::observed::{fetch_group, group_status_from_wire};
use crate::provider::{NetworkingClient, SECURITY_GROUP_RESOURCE};
use crate::status::GroupStatus;

/// Description attached to every group this reconciler creates.
pub const GROUP_DESCRIPTION: &str = "Cluster API managed group";

/// Creates and deletes whole groups. Rules are left to the rule reconciler.
pub struct GroupLifecycle<'a> {
    client: &'a dyn NetworkingClient,
    audit: &'a ClusterAuditLogger,
    project_id: Option<&'a str>,
}

impl<'a> GroupLifecycle<'a> {
    pub fn new(
        client: &'a dyn NetworkingClient,
        audit: &'a ClusterAuditLogger,
        project_id: Option<&'a str>,
    ) -> Self {
        Self {
            client,
            audit,
            project_id,
        }
    }

    /// Make sure a group named `name` exists and return its observed state.
    ///
    /// A new group gets `tags` applied. An existing group is reused as is and
    /// is not re-tagged.
    pub async fn ensure_group(&self, name: &str, tags: &[String]) -> Result<GroupStatus> {
        let existing = fetch_group(self.client, name, self.project_id).await?;
        if existing.exists() {
            debug!(name, id = %existing.id, "Reuse existing security group");
            return Ok(existing);
        }

        debug!(name, "Group doesn't exist, creating it");
        let group = match self.client.create_group(name, GROUP_DESCRIPTION).await {
            Ok(group) => group,
            Err(e) => {
                self.audit.security_group_create_failed(name, &e);
                return Err(e.into());
            }
        };

        // Reused groups are never re-tagged, so a failure here is reported
        // like a failed create.
        if !tags.is_empty() {
            if let Err(e) = self
                .client
                .replace_tags(SECURITY_GROUP_RESOURCE, &group.id, tags)
                .await
            {
                self.audit.security_group_create_failed(name, &e);
                return Err(e.into());
            }
        }

        info!(name, id = %group.id, "Created security group");
        self.audit.security_group_created(name, &group.id);
        group_status_from_wire(group)
    }

    /// Delete the group named `name`, if there is one.
    ///
    /// The provider removes the group's rules along with it.
    pub async fn delete_group(&self, name: &str) -> Result<()> {
        let group = fetch_group(self.client, name, self.project_id).await?;
        if !group.exists() {
            debug!(name, "Security group already absent");
            return Ok(());
        }

        if let Err(e) = self.client.delete_group(&group.id).await {
            self.audit.security_group_delete_failed(&group.name, &group.id, &e);
            return Err(e.into());
        }

        info!(name, id = %group.id, "Deleted security group");
        self.audit.security_group_deleted(&group.name, &group.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audit::RecordingSink;
    use crate::error::{ProviderError, SecGroupError};
    use crate::provider::MemoryNetworking;
    use crate::provider::memory::Operation;

    fn tags() -> Vec<String> {
        vec!["env=test".to_string()]
    }

    #[tokio::test]
    async fn test_ensure_creates_and_tags_once() {
        let net = MemoryNetworking::new();
        let sink = Arc::new(RecordingSink::new());
        let audit = ClusterAuditLogger::with_sink("c", sink.clone());
        let lifecycle = GroupLifecycle::new(&net, &audit, None);

        let created = lifecycle.ensure_group("g", &tags()).await.unwrap();
        assert!(created.exists());
        let group = net.group(&created.id).unwrap();
        assert_eq!(group.description, GROUP_DESCRIPTION);
        assert_eq!(group.tags, tags());

        net.clear_calls();
        let reused = lifecycle.ensure_group("g", &tags()).await.unwrap();
        assert_eq!(reused.id, created.id);
        assert!(net.mutations().is_empty());
        assert_eq!(sink.reasons(), vec!["SuccessfulCreateSecurityGroup"]);
    }

    #[tokio::test]
    async fn test_ensure_without_tags_skips_tag_call() {
        let net = MemoryNetworking::new();
        let audit = ClusterAuditLogger::new_noop();
        let lifecycle = GroupLifecycle::new(&net, &audit, None);

        lifecycle.ensure_group("g", &[]).await.unwrap();
        let ops: Vec<Operation> = net.mutations().iter().map(|c| c.operation).collect();
        assert_eq!(ops, vec![Operation::CreateGroup]);
    }

    #[tokio::test]
    async fn test_ensure_records_failure_event() {
        let net = MemoryNetworking::new();
        net.fail_next(Operation::CreateGroup, ProviderError::Api("quota exceeded".into()));
        let sink = Arc::new(RecordingSink::new());
        let audit = ClusterAuditLogger::with_sink("c", sink.clone());
        let lifecycle = GroupLifecycle::new(&net, &audit, None);

        let err = lifecycle.ensure_group("g", &[]).await.unwrap_err();
        assert!(matches!(err, SecGroupError::Provider(ProviderError::Api(_))));
        assert_eq!(sink.reasons(), vec!["FailedCreateSecurityGroup"]);
    }

    #[tokio::test]
    async fn test_tagging_failure_records_event() {
        let net = MemoryNetworking::new();
        net.fail_next(Operation::ReplaceTags, ProviderError::Api("tag limit".into()));
        let sink = Arc::new(RecordingSink::new());
        let audit = ClusterAuditLogger::with_sink("c", sink.clone());
        let lifecycle = GroupLifecycle::new(&net, &audit, None);

        let err = lifecycle.ensure_group("g", &tags()).await.unwrap_err();
        assert!(matches!(err, SecGroupError::Provider(ProviderError::Api(_))));
        assert_eq!(sink.reasons(), vec!["FailedCreateSecurityGroup"]);
        assert!(sink.events()[0].message.contains("tag limit"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let net = MemoryNetworking::new();
        let sink = Arc::new(RecordingSink::new());
        let audit = ClusterAuditLogger::with_sink("c", sink.clone());
        let lifecycle = GroupLifecycle::new(&net, &audit, None);

        let id = net.seed_group("g", None);
        lifecycle.delete_group("g").await.unwrap();
        assert!(net.group(&id).is_none());

        net.clear_calls();
        lifecycle.delete_group("g").await.unwrap();
        assert!(net.mutations().is_empty());
        assert_eq!(sink.reasons(), vec!["SuccessfulDeleteSecurityGroup"]);
    }

    #[tokio::test]
    async fn test_delete_failure_records_warning() {
        let net = MemoryNetworking::new();
        net.seed_group("g", None);
        net.fail_next(Operation::DeleteGroup, ProviderError::Api("in use".into()));
        let sink = Arc::new(RecordingSink::new());
        let audit = ClusterAuditLogger::with_sink("c", sink.clone());
        let lifecycle = GroupLifecycle::new(&net, &audit, None);

        assert!(lifecycle.delete_group("g").await.is_err());
        assert_eq!(sink.reasons(), vec!["FailedDeleteSecurityGroup"]);
    }
}
