//! Property-based tests for addressing and trust-map invariants.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use std::collections::HashSet;

use proptest::prelude::*;

use fleet_cli::domain::topology::MAX_NODES;
use fleet_cli::domain::trust::{is_cluster_principal, replace_principal};
use fleet_cli::domain::{FleetSpec, HostIdentity, NetworkPlan, Topology, TrustMap};

fn plan(a: u8, b: u8) -> NetworkPlan {
    NetworkPlan::new("fleet-net", &format!("{a}.{b}")).expect("two octets")
}

fn identities(topology: &Topology) -> Vec<HostIdentity> {
    topology
        .nodes()
        .iter()
        .map(|node| {
            let raw = format!("ssh-ed25519 AAAAkey{} root@{}", node.index, node.name);
            HostIdentity::from_harvest(node, &raw).expect("valid key")
        })
        .collect()
}

// ============================================================================
// Address allocation
// ============================================================================

proptest! {
    /// No two nodes share an address or a port, for any prefix and size.
    #[test]
    fn prop_allocation_is_injective(a in any::<u8>(), b in any::<u8>(), n in 1..=MAX_NODES) {
        let plan = plan(a, b);
        let topology = Topology::new(&plan, FleetSpec::new(n).expect("in range"));
        let addresses: HashSet<_> = topology.nodes().iter().map(|node| node.address).collect();
        let ports: HashSet<_> = topology.nodes().iter().map(|node| node.port).collect();
        prop_assert_eq!(addresses.len(), topology.len());
        prop_assert_eq!(ports.len(), topology.len());
    }

    /// Every address is a usable host inside the subnet, never the gateway.
    #[test]
    fn prop_addresses_stay_inside_the_subnet(a in any::<u8>(), b in any::<u8>(), n in 1..=MAX_NODES) {
        let plan = plan(a, b);
        for node in Topology::new(&plan, FleetSpec::new(n).expect("in range")).nodes() {
            let [oa, ob, oc, od] = node.address.octets();
            prop_assert_eq!((oa, ob, oc), (a, b, 0));
            prop_assert!(od > 10 && od < 255);
            prop_assert_ne!(node.address, plan.gateway());
            prop_assert!(plan.is_node_address(&node.address.to_string()));
            prop_assert_eq!(u32::from(node.port), 2221 + node.index);
        }
    }

    /// Anything that is not a positive integer up to the maximum is rejected.
    #[test]
    fn prop_out_of_range_sizes_are_rejected(n in (MAX_NODES + 1)..u32::MAX) {
        prop_assert!(FleetSpec::new(n).is_err());
        prop_assert!(FleetSpec::parse(&n.to_string()).is_err());
    }

    #[test]
    fn prop_non_numeric_sizes_are_rejected(input in "[a-z ]{1,8}") {
        prop_assert!(FleetSpec::parse(&input).is_err());
    }
}

// ============================================================================
// Trust map
// ============================================================================

proptest! {
    /// Every node is bound under all three principal forms, each to its own key.
    #[test]
    fn prop_trust_map_binds_three_forms_per_node(n in 1u32..=32) {
        let plan = plan(172, 28);
        let topology = Topology::new(&plan, FleetSpec::new(n).expect("in range"));
        let map = TrustMap::from_identities(&identities(&topology));

        prop_assert_eq!(map.len(), 3 * topology.len());
        for node in topology.nodes() {
            let expected = format!("ssh-ed25519 AAAAkey{}", node.index);
            prop_assert_eq!(map.key_for(&node.name), Some(expected.as_str()));
            prop_assert_eq!(map.key_for(&node.address.to_string()), Some(expected.as_str()));
            prop_assert_eq!(map.key_for(&node.alias()), Some(expected.as_str()));
        }
        // Rendered lines are unique and all are fleet principals.
        let rendered = map.render_known_hosts();
        let lines: Vec<&str> = rendered.lines().collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        prop_assert_eq!(lines.len(), unique.len());
        for line in lines {
            let principal = line.split_whitespace().next().expect("principal");
            prop_assert!(is_cluster_principal(&plan, principal));
        }
    }

    /// Re-pinning a principal leaves exactly one line for it.
    #[test]
    fn prop_replace_principal_never_duplicates(port in 2222u16..2466, repeats in 1usize..5) {
        let principal = format!("[localhost]:{port}");
        let mut content = String::from("github.com ssh-ed25519 AAAAother\n");
        for i in 0..repeats {
            content = replace_principal(&content, &principal, &format!("ssh-ed25519 AAAA{i}"));
        }
        let bound: Vec<&str> = content
            .lines()
            .filter(|l| l.starts_with(&format!("{principal} ")))
            .collect();
        prop_assert_eq!(bound.len(), 1);
        prop_assert!(content.starts_with("github.com "));
    }
}
