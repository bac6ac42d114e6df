//! In-memory networking backend.
//!
//! Behaves like a provider that assigns UUIDs and cascades group deletion to
//! rules. Every call is journaled so callers can assert exactly which
//! mutations a pass issued. State can be saved to and loaded from a JSON file.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{
    CreateRuleRequest, ListGroupsFilter, NetworkingClient, ProviderResult, WireGroup, WireRule,
};
use crate::error::ProviderError;
use crate::rule::RemoteRef;

/// Provider operations, used for the call journal and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListGroups,
    CreateGroup,
    DeleteGroup,
    CreateRule,
    DeleteRule,
    ReplaceTags,
}

impl Operation {
    /// Whether the operation changes provider state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Operation::ListGroups)
    }
}

/// One journaled provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    /// Group name, group ID or rule ID the call targeted.
    pub target: String,
}

/// Persistent part of the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    groups: BTreeMap<String, WireGroup>,
}

#[derive(Default)]
struct Inner {
    state: State,
    calls: Vec<Call>,
    failures: HashMap<Operation, ProviderError>,
}

/// Networking provider that keeps groups and rules in process memory.
#[derive(Default)]
pub struct MemoryNetworking {
    project_id: Option<String>,
    inner: Mutex<Inner>,
}

impl MemoryNetworking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups created through this client are owned by `project_id`.
    pub fn with_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            inner: Mutex::default(),
        }
    }

    /// Load state previously written by [`MemoryNetworking::save`].
    /// A missing file yields an empty backend.
    pub fn load(path: &Path, project_id: Option<String>) -> Result<Self> {
        let state = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read provider state {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Invalid provider state {}", path.display()))?
        } else {
            State::default()
        };

        Ok(Self {
            project_id,
            inner: Mutex::new(Inner {
                state,
                ..Default::default()
            }),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.lock().state)?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write provider state {}", path.display()))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a group directly, bypassing the journal. Returns its ID.
    pub fn seed_group(&self, name: &str, project_id: Option<&str>) -> String {
        let id = Uuid::new_v4().to_string();
        self.lock().state.groups.insert(
            id.clone(),
            WireGroup {
                id: id.clone(),
                name: name.to_string(),
                project_id: project_id.map(str::to_string),
                ..Default::default()
            },
        );
        id
    }

    /// Insert a rule directly, bypassing the journal. Returns its ID.
    pub fn seed_rule(&self, group_id: &str, rule: &crate::rule::RuleSpec) -> String {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.lock();
        if let Some(group) = inner.state.groups.get_mut(group_id) {
            group
                .rules
                .push(WireRule::from_rule(id.clone(), group_id, rule));
        }
        id
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: ProviderError) {
        self.lock().failures.insert(operation, error);
    }

    /// All calls issued so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that changed provider state.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation.is_mutation())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Snapshot of a group by ID.
    pub fn group(&self, id: &str) -> Option<WireGroup> {
        self.lock().state.groups.get(id).cloned()
    }

    pub fn groups(&self) -> Vec<WireGroup> {
        self.lock().state.groups.values().cloned().collect()
    }

    /// Journal a call and consume an injected failure, if any.
    fn record(&self, inner: &mut Inner, operation: Operation, target: &str) -> ProviderResult<()> {
        inner.calls.push(Call {
            operation,
            target: target.to_string(),
        });
        match inner.failures.remove(&operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NetworkingClient for MemoryNetworking {
    async fn list_groups(&self, filter: &ListGroupsFilter) -> ProviderResult<Vec<WireGroup>> {
        let mut inner = self.lock();
        self.record(&mut inner, Operation::ListGroups, &filter.name)?;

        Ok(inner
            .state
            .groups
            .values()
            .filter(|g| g.name == filter.name)
            .filter(|g| match &filter.project_id {
                Some(project) => g.project_id.as_ref() == Some(project),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn create_group(&self, name: &str, description: &str) -> ProviderResult<WireGroup> {
        let mut inner = self.lock();
        self.record(&mut inner, Operation::CreateGroup, name)?;

        let group = WireGroup {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            project_id: self.project_id.clone(),
            tags: Vec::new(),
            rules: Vec::new(),
        };
        debug!(id = %group.id, name, "memory: created group");
        inner.state.groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: &str) -> ProviderResult<()> {
        let mut inner = self.lock();
        self.record(&mut inner, Operation::DeleteGroup, id)?;

        match inner.state.groups.remove(id) {
            Some(_) => Ok(()),
            None => Err(ProviderError::NotFound(format!("security group {}", id))),
        }
    }

    async fn create_rule(&self, request: &CreateRuleRequest) -> ProviderResult<WireRule> {
        let mut inner = self.lock();
        self.record(&mut inner, Operation::CreateRule, &request.security_group_id)?;

        match &request.rule.remote {
            RemoteRef::SelfGroup => {
                return Err(ProviderError::Api(
                    "remote group must be a group ID, got self reference".to_string(),
                ));
            }
            RemoteRef::Group(remote) if !inner.state.groups.contains_key(remote) => {
                return Err(ProviderError::NotFound(format!(
                    "remote security group {}",
                    remote
                )));
            }
            _ => {}
        }

        let group = inner
            .state
            .groups
            .get_mut(&request.security_group_id)
            .ok_or_else(|| {
                ProviderError::NotFound(format!("security group {}", request.security_group_id))
            })?;

        let rule = WireRule::from_rule(
            Uuid::new_v4().to_string(),
            request.security_group_id.clone(),
            &request.rule,
        );
        group.rules.push(rule.clone());
        Ok(rule)
    }

    async fn delete_rule(&self, id: &str) -> ProviderResult<()> {
        let mut inner = self.lock();
        self.record(&mut inner, Operation::DeleteRule, id)?;

        for group in inner.state.groups.values_mut() {
            if let Some(pos) = group.rules.iter().position(|r| r.id == id) {
                group.rules.remove(pos);
                return Ok(());
            }
        }
        Err(ProviderError::NotFound(format!("security group rule {}", id)))
    }

    async fn replace_tags(
        &self,
        resource_kind: &str,
        id: &str,
        tags: &[String],
    ) -> ProviderResult<()> {
        let mut inner = self.lock();
        self.record(&mut inner, Operation::ReplaceTags, id)?;

        if resource_kind != super::SECURITY_GROUP_RESOURCE {
            return Err(ProviderError::Api(format!(
                "unsupported resource kind {}",
                resource_kind
            )));
        }
        let group = inner
            .state
            .groups
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(format!("security group {}", id)))?;
        group.tags = tags.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSpec;

    #[tokio::test]
    async fn test_delete_group_cascades_rules() {
        let net = MemoryNetworking::new();
        let group = net.create_group("g", "").await.unwrap();
        let rule = net
            .create_rule(&CreateRuleRequest {
                security_group_id: group.id.clone(),
                rule: RuleSpec::ingress().tcp().port(22),
            })
            .await
            .unwrap();

        net.delete_group(&group.id).await.unwrap();
        assert!(net.group(&group.id).is_none());
        assert!(matches!(
            net.delete_rule(&rule.id).await,
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_scoped_to_project() {
        let net = MemoryNetworking::new();
        net.seed_group("g", Some("p1"));
        net.seed_group("g", Some("p2"));

        let filter = ListGroupsFilter {
            name: "g".to_string(),
            project_id: Some("p1".to_string()),
        };
        assert_eq!(net.list_groups(&filter).await.unwrap().len(), 1);

        let unscoped = ListGroupsFilter {
            name: "g".to_string(),
            project_id: None,
        };
        assert_eq!(net.list_groups(&unscoped).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_self_sentinel() {
        let net = MemoryNetworking::new();
        let group = net.create_group("g", "").await.unwrap();
        let result = net
            .create_rule(&CreateRuleRequest {
                security_group_id: group.id,
                rule: RuleSpec::ingress().from_self(),
            })
            .await;
        assert!(matches!(result, Err(ProviderError::Api(_))));
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let net = MemoryNetworking::new();
        net.fail_next(Operation::CreateGroup, ProviderError::Api("quota".into()));

        assert!(net.create_group("g", "").await.is_err());
        assert!(net.create_group("g", "").await.is_ok());
        assert_eq!(net.mutations().len(), 2);
    }

    #[test]
    fn test_save_and_load_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let net = MemoryNetworking::new();
        let id = net.seed_group("g", None);
        net.seed_rule(&id, &RuleSpec::ingress().tcp().port(443));
        net.save(&path).unwrap();

        let loaded = MemoryNetworking::load(&path, None).unwrap();
        let group = loaded.group(&id).unwrap();
        assert_eq!(group.name, "g");
        assert_eq!(group.rules.len(), 1);
        assert_eq!(group.rules[0].port_range_min, Some(443));
        assert!(loaded.calls().is_empty());
    }
}
