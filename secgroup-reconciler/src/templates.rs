//! Fixed rule templates shared by the managed groups.

use crate::rule::{EtherType, RuleSpec};

pub const API_SERVER_PORT: u16 = 6443;
pub const SSH_PORT: u16 = 22;
pub const NODE_PORT_MIN: u16 = 30000;
pub const NODE_PORT_MAX: u16 = 32767;
pub const ETCD_PORT_MIN: u16 = 2379;
pub const ETCD_PORT_MAX: u16 = 2380;
pub const KUBELET_PORT: u16 = 10250;

/// Baseline rules every managed group starts from.
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::egress(EtherType::IPv4).description("Full open"),
        RuleSpec::egress(EtherType::IPv6).description("Full open"),
    ]
}

pub fn control_plane_https() -> Vec<RuleSpec> {
    vec![
        RuleSpec::ingress()
            .description("Kubernetes API")
            .tcp()
            .port(API_SERVER_PORT),
    ]
}

pub fn worker_node_ports() -> Vec<RuleSpec> {
    vec![
        RuleSpec::ingress()
            .description("Node Port Services")
            .tcp()
            .ports(NODE_PORT_MIN, NODE_PORT_MAX),
    ]
}

pub fn control_plane_additional_ports(ports: &[u16]) -> Vec<RuleSpec> {
    ports
        .iter()
        .map(|port| {
            RuleSpec::ingress()
                .description("Additional API server port")
                .tcp()
                .port(*port)
        })
        .collect()
}

/// Unrestricted ingress from the group itself and from its peer group.
pub fn allow_all_in_cluster(peer_id: &str) -> Vec<RuleSpec> {
    vec![
        RuleSpec::ingress()
            .description("In-cluster Ingress")
            .from_self(),
        RuleSpec::ingress()
            .description("In-cluster Ingress")
            .from_group(peer_id),
    ]
}

pub fn control_plane_general(worker_id: &str) -> Vec<RuleSpec> {
    vec![
        RuleSpec::ingress()
            .description("Etcd")
            .tcp()
            .ports(ETCD_PORT_MIN, ETCD_PORT_MAX)
            .from_self(),
        RuleSpec::ingress()
            .description("Kubelet API")
            .tcp()
            .port(KUBELET_PORT)
            .from_self(),
        RuleSpec::ingress()
            .description("Kubelet API")
            .tcp()
            .port(KUBELET_PORT)
            .from_group(worker_id),
    ]
}

pub fn worker_general(control_plane_id: &str) -> Vec<RuleSpec> {
    vec![
        RuleSpec::ingress()
            .description("Kubelet API")
            .tcp()
            .port(KUBELET_PORT)
            .from_self(),
        RuleSpec::ingress()
            .description("Kubelet API")
            .tcp()
            .port(KUBELET_PORT)
            .from_group(control_plane_id),
    ]
}

/// SSH into cluster nodes, only from the bastion group.
pub fn ssh_from_bastion(bastion_id: &str) -> Vec<RuleSpec> {
    vec![
        RuleSpec::ingress()
            .description("SSH")
            .tcp()
            .port(SSH_PORT)
            .from_group(bastion_id),
    ]
}

/// Rules of the bastion group itself.
pub fn bastion_rules() -> Vec<RuleSpec> {
    let mut rules = vec![
        RuleSpec::ingress()
            .description("SSH")
            .tcp()
            .port(SSH_PORT),
    ];
    rules.extend(default_rules());
    rules
}
