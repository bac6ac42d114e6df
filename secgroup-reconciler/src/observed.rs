//! Observed-state fetching and wire conversion.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SecGroupError};
use crate::provider::{ListGroupsFilter, NetworkingClient, WireGroup, WireRule};
use crate::rule::{Direction, EtherType, Protocol, RemoteRef, RuleSpec, RuleStatus};
use crate::status::GroupStatus;

/// Look up a group by its exact name.
///
/// No match returns the absent status, not an error. More than one match is
/// an error: names are expected to be unique, so duplicates mean someone
/// changed the provider behind our back.
pub async fn fetch_group(
    client: &dyn NetworkingClient,
    name: &str,
    project_id: Option<&str>,
) -> Result<GroupStatus> {
    debug!(name, "Attempting to fetch security group");

    let filter = ListGroupsFilter {
        name: name.to_string(),
        project_id: project_id.map(str::to_string),
    };
    let mut groups = client.list_groups(&filter).await?;

    match groups.len() {
        0 => Ok(GroupStatus::absent()),
        1 => group_status_from_wire(groups.remove(0)),
        _ => Err(SecGroupError::AmbiguousGroupName(name.to_string())),
    }
}

/// Reference to user-supplied security groups, by ID or by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFilter {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "projectID")]
    pub project_id: Option<String>,
}

/// Resolve group filters into de-duplicated IDs, in first-seen order.
///
/// An explicit ID is taken as is. A name is looked up in the filter's
/// project, or `default_project` when none is given, and every match is
/// kept. A name without matches is an error.
pub async fn resolve_group_ids(
    client: &dyn NetworkingClient,
    filters: &[GroupFilter],
    default_project: Option<&str>,
) -> Result<Vec<String>> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: String| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };

    for filter in filters {
        if let Some(id) = filter.id.as_deref().filter(|id| !id.is_empty()) {
            push(id.to_string());
            continue;
        }

        let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let list_filter = ListGroupsFilter {
            name: name.to_string(),
            project_id: filter
                .project_id
                .clone()
                .or_else(|| default_project.map(str::to_string)),
        };
        let groups = client.list_groups(&list_filter).await?;
        if groups.is_empty() {
            return Err(SecGroupError::GroupNotFound(name.to_string()));
        }
        debug!(name, matches = groups.len(), "Resolved security group filter");
        for group in groups {
            push(group.id);
        }
    }

    Ok(ids)
}

/// Convert a provider group into observed status.
pub fn group_status_from_wire(group: WireGroup) -> Result<GroupStatus> {
    let rules = group
        .rules
        .into_iter()
        .map(rule_status_from_wire)
        .collect::<Result<Vec<_>>>()?;

    Ok(GroupStatus {
        id: group.id,
        name: group.name,
        rules,
    })
}

/// Convert a provider rule into observed status.
///
/// Empty strings are treated as unset. A rule carrying both a remote group
/// and a remote prefix is reported as a group reference.
pub fn rule_status_from_wire(rule: WireRule) -> Result<RuleStatus> {
    let malformed = |reason: String| SecGroupError::MalformedRule {
        id: rule.id.clone(),
        reason,
    };

    let direction: Direction = non_empty(rule.direction.clone())
        .ok_or_else(|| malformed("missing direction".to_string()))?
        .parse()
        .map_err(malformed)?;

    let ether_type: EtherType = match non_empty(rule.ether_type.clone()) {
        Some(e) => e.parse().map_err(malformed)?,
        None => Default::default(),
    };

    let remote = match (
        non_empty(rule.remote_group_id.clone()),
        non_empty(rule.remote_ip_prefix.clone()),
    ) {
        (Some(group), _) => RemoteRef::Group(group),
        (None, Some(prefix)) => RemoteRef::Prefix(prefix),
        (None, None) => RemoteRef::Any,
    };

    Ok(RuleStatus {
        rule: RuleSpec {
            description: non_empty(rule.description),
            direction,
            ether_type,
            protocol: non_empty(rule.protocol).map(Protocol::from),
            port_range_min: rule.port_range_min,
            port_range_max: rule.port_range_max,
            remote,
        },
        id: rule.id,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryNetworking;

    #[tokio::test]
    async fn test_fetch_missing_group_is_absent() {
        let net = MemoryNetworking::new();
        let status = fetch_group(&net, "nope", None).await.unwrap();
        assert_eq!(status, GroupStatus::absent());
    }

    #[tokio::test]
    async fn test_fetch_single_group_converts_rules() {
        let net = MemoryNetworking::new();
        let id = net.seed_group("g", None);
        net.seed_rule(&id, &RuleSpec::ingress().description("SSH").tcp().port(22));

        let status = fetch_group(&net, "g", None).await.unwrap();
        assert_eq!(status.id, id);
        assert_eq!(status.name, "g");
        assert_eq!(status.rules.len(), 1);
        assert_eq!(
            status.rules[0].rule,
            RuleSpec::ingress().description("SSH").tcp().port(22)
        );
    }

    #[tokio::test]
    async fn test_fetch_duplicate_names_is_ambiguous() {
        let net = MemoryNetworking::new();
        net.seed_group("g", None);
        net.seed_group("g", None);

        let err = fetch_group(&net, "g", None).await.unwrap_err();
        assert!(matches!(err, SecGroupError::AmbiguousGroupName(ref n) if n == "g"));
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_resolve_filters_dedups_ids() {
        let net = MemoryNetworking::new();
        let web = net.seed_group("web", Some("p1"));
        net.seed_group("web", Some("p2"));

        let filters = vec![
            GroupFilter {
                id: Some(web.clone()),
                ..Default::default()
            },
            GroupFilter {
                name: Some("web".to_string()),
                ..Default::default()
            },
            GroupFilter {
                id: Some("external-sg".to_string()),
                ..Default::default()
            },
        ];

        let ids = resolve_group_ids(&net, &filters, Some("p1")).await.unwrap();
        assert_eq!(ids, vec![web, "external-sg".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_name_is_not_found() {
        let net = MemoryNetworking::new();
        let filters = vec![GroupFilter {
            name: Some("missing".to_string()),
            ..Default::default()
        }];

        let err = resolve_group_ids(&net, &filters, None).await.unwrap_err();
        assert!(matches!(err, SecGroupError::GroupNotFound(ref n) if n == "missing"));
    }

    #[test]
    fn test_wire_empty_strings_are_unset() {
        let wire = WireRule {
            id: "r".to_string(),
            security_group_id: "sg".to_string(),
            description: Some(String::new()),
            direction: Some("egress".to_string()),
            ether_type: Some("IPv6".to_string()),
            protocol: Some(String::new()),
            port_range_min: None,
            port_range_max: None,
            remote_group_id: Some(String::new()),
            remote_ip_prefix: Some(String::new()),
        };

        let status = rule_status_from_wire(wire).unwrap();
        assert_eq!(status.rule, RuleSpec::new(Direction::Egress, EtherType::IPv6));
    }

    #[test]
    fn test_wire_bad_direction_is_malformed() {
        let wire = WireRule {
            id: "r".to_string(),
            direction: Some("sideways".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            rule_status_from_wire(wire),
            Err(SecGroupError::MalformedRule { .. })
        ));
    }
}
