//! Per-call timeout wrapper.
//!
//! The reconciler never applies timeouts itself. Callers that want them wrap
//! their client in [`TimeoutClient`]; an elapsed call surfaces as
//! [`ProviderError::Timeout`] like any other provider error.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{CreateRuleRequest, ListGroupsFilter, NetworkingClient, ProviderResult, WireGroup, WireRule};
use crate::error::ProviderError;

/// Networking client that bounds every call by a fixed timeout.
pub struct TimeoutClient<C> {
    inner: C,
    timeout: Duration,
}

impl<C> TimeoutClient<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        call: &'static str,
        fut: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(call, timeout = ?self.timeout, "Provider call timed out");
                Err(ProviderError::Timeout(call))
            }
        }
    }
}

#[async_trait]
impl<C: NetworkingClient> NetworkingClient for TimeoutClient<C> {
    async fn list_groups(&self, filter: &ListGroupsFilter) -> ProviderResult<Vec<WireGroup>> {
        self.bounded("list_groups", self.inner.list_groups(filter))
            .await
    }

    async fn create_group(&self, name: &str, description: &str) -> ProviderResult<WireGroup> {
        self.bounded("create_group", self.inner.create_group(name, description))
            .await
    }

    async fn delete_group(&self, id: &str) -> ProviderResult<()> {
        self.bounded("delete_group", self.inner.delete_group(id))
            .await
    }

    async fn create_rule(&self, request: &CreateRuleRequest) -> ProviderResult<WireRule> {
        self.bounded("create_rule", self.inner.create_rule(request))
            .await
    }

    async fn delete_rule(&self, id: &str) -> ProviderResult<()> {
        self.bounded("delete_rule", self.inner.delete_rule(id))
            .await
    }

    async fn replace_tags(
        &self,
        resource_kind: &str,
        id: &str,
        tags: &[String],
    ) -> ProviderResult<()> {
        self.bounded("replace_tags", self.inner.replace_tags(resource_kind, id, tags))
            .await
    }
}
