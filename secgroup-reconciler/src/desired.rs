//! Desired-state generation.
//!
//! Desired groups are a pure function of the cluster configuration and the
//! resolution table. They carry no provider identifiers of their own; rules
//! that point at the owning group use [`RemoteRef::SelfGroup`].

use crate::config::{ClusterConfig, RuleTemplate};
use crate::error::ConfigError;
use crate::resolution::ResolutionTable;
use crate::role::Role;
use crate::rule::{RemoteRef, RuleSpec};
use crate::templates;

/// Target state of one managed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub role: Role,
    pub name: String,
    pub rules: Vec<RuleSpec>,
}

/// Build the desired group for every enabled role, in role order.
///
/// Returns an empty list when security groups are not managed. Any
/// configuration error aborts the whole generation.
pub fn generate(
    config: &ClusterConfig,
    table: &ResolutionTable,
) -> Result<Vec<GroupSpec>, ConfigError> {
    if !config.managed() {
        return Ok(Vec::new());
    }

    let control_plane_id = table.get(Role::ControlPlane)?;
    let worker_id = table.get(Role::Worker)?;

    let mut control_plane = templates::default_rules();
    let mut worker = templates::default_rules();

    control_plane.extend(templates::control_plane_https());
    worker.extend(templates::worker_node_ports());

    control_plane.extend(templates::control_plane_additional_ports(
        config.additional_ports(),
    ));

    if config.allow_all_in_cluster_traffic() {
        control_plane.extend(templates::allow_all_in_cluster(worker_id));
        worker.extend(templates::allow_all_in_cluster(control_plane_id));
    } else {
        control_plane.extend(templates::control_plane_general(worker_id));
        worker.extend(templates::worker_general(control_plane_id));
    }

    // There is no separate all-nodes group: its rules land in both node groups.
    let all_nodes = expand_all_nodes_rules(config.all_nodes_rules(), table)?;
    control_plane.extend(all_nodes.iter().cloned());
    worker.extend(all_nodes);

    let mut groups = Vec::with_capacity(3);

    let bastion = if config.bastion_enabled() {
        let bastion_id = table.get(Role::Bastion)?;
        control_plane.extend(templates::ssh_from_bastion(bastion_id));
        worker.extend(templates::ssh_from_bastion(bastion_id));
        Some(GroupSpec {
            role: Role::Bastion,
            name: Role::Bastion.group_name(&config.name),
            rules: templates::bastion_rules(),
        })
    } else {
        None
    };

    groups.push(GroupSpec {
        role: Role::ControlPlane,
        name: Role::ControlPlane.group_name(&config.name),
        rules: control_plane,
    });
    groups.push(GroupSpec {
        role: Role::Worker,
        name: Role::Worker.group_name(&config.name),
        rules: worker,
    });
    groups.extend(bastion);

    Ok(groups)
}

/// Expand all-nodes templates into concrete rules.
///
/// A template naming N managed roles becomes N rules, one per resolved ID.
pub fn expand_all_nodes_rules(
    templates: &[RuleTemplate],
    table: &ResolutionTable,
) -> Result<Vec<RuleSpec>, ConfigError> {
    let mut rules = Vec::with_capacity(templates.len());

    for (i, template) in templates.iter().enumerate() {
        template.validate(i, table.roles())?;

        // Empty strings mean unset, as in provider data.
        let base = RuleSpec {
            description: template.description.clone().filter(|d| !d.is_empty()),
            direction: template.direction,
            ether_type: template.ether_type.unwrap_or_default(),
            protocol: template
                .protocol
                .clone()
                .filter(|p| !p.as_str().is_empty()),
            port_range_min: template.port_range_min,
            port_range_max: template.port_range_max,
            remote: RemoteRef::Any,
        };

        if !template.remote_managed_groups.is_empty() {
            for role in &template.remote_managed_groups {
                let id = table.get(*role)?;
                rules.push(base.clone().from_group(id));
            }
        } else if let Some(id) = template.remote_group() {
            rules.push(base.from_group(id));
        } else if let Some(prefix) = template.remote_prefix() {
            rules.push(base.remote(RemoteRef::Prefix(prefix.to_string())));
        }
    }

    Ok(rules)
}
