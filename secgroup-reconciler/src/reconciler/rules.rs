//! Diff-apply for the rules of one existing group.
//!
//! The diff is two independent passes over the desired and observed lists.
//! Rules are compared as values, so re-running against a converged group
//! issues no calls at all. Nothing here is transactional: a failed call
//! leaves earlier changes in place, and the next pass picks up from there.

use tracing::{debug, info};

use crate::desired::GroupSpec;
use crate::error::Result;
use crate::observed::rule_status_from_wire;
use crate::provider::{CreateRuleRequest, NetworkingClient};
use crate::rule::{RuleSpec, RuleStatus, matches};
use crate::status::GroupStatus;

/// Changes needed to bring one group's rules to the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePlan {
    /// Observed rules no desired rule matches.
    pub to_delete: Vec<RuleStatus>,
    /// Observed rules that satisfy a desired rule, IDs preserved.
    pub to_keep: Vec<RuleStatus>,
    /// Desired rules with no observed match, self-references resolved.
    pub to_create: Vec<RuleSpec>,
}

impl RulePlan {
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }
}

/// Compute the rule changes for `observed` to match `desired`.
pub fn plan_rules(desired: &GroupSpec, observed: &GroupStatus) -> RulePlan {
    let self_id = observed.id.as_str();

    let to_delete = observed
        .rules
        .iter()
        .filter(|o| !desired.rules.iter().any(|d| matches(d, o, self_id)))
        .cloned()
        .collect();

    let mut to_keep = Vec::new();
    let mut to_create = Vec::new();
    for desired_rule in &desired.rules {
        match observed
            .rules
            .iter()
            .find(|o| matches(desired_rule, o, self_id))
        {
            Some(existing) => to_keep.push(existing.clone()),
            None => to_create.push(desired_rule.resolve_self(self_id)),
        }
    }

    RulePlan {
        to_delete,
        to_keep,
        to_create,
    }
}

/// Converge the rules of an existing group.
///
/// Deletions are issued before creations. The first failing call aborts the
/// pass without rolling back. A group reconciled down to zero rules is
/// reported as the absent status.
pub async fn reconcile_group_rules(
    client: &dyn NetworkingClient,
    desired: &GroupSpec,
    observed: GroupStatus,
) -> Result<GroupStatus> {
    let plan = plan_rules(desired, &observed);
    let changed = !plan.is_noop();

    debug!(
        name = %observed.name,
        amount = plan.to_delete.len(),
        "Deleting rules not needed anymore for group"
    );
    for rule in &plan.to_delete {
        debug!(id = %rule.id, name = %observed.name, "Deleting rule");
        client.delete_rule(&rule.id).await?;
    }

    debug!(
        name = %observed.name,
        amount = plan.to_create.len(),
        "Creating new rules needed for group"
    );
    let mut reconciled = plan.to_keep;
    for rule in plan.to_create {
        debug!(
            name = %observed.name,
            description = ?rule.description,
            direction = %rule.direction,
            ether_type = %rule.ether_type,
            protocol = ?rule.protocol,
            port_range_min = ?rule.port_range_min,
            port_range_max = ?rule.port_range_max,
            remote = ?rule.remote,
            "Creating rule"
        );
        let request = CreateRuleRequest {
            security_group_id: observed.id.clone(),
            rule,
        };
        let created = client.create_rule(&request).await?;
        reconciled.push(rule_status_from_wire(created)?);
    }

    if changed {
        info!(name = %observed.name, rules = reconciled.len(), "Reconciled security group rules");
    }

    if reconciled.is_empty() {
        return Ok(GroupStatus::absent());
    }

    Ok(GroupStatus {
        rules: reconciled,
        ..observed
    })
}
