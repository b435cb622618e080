//! Fleet sizing and deterministic addressing.
//!
//! Pure functions only — no I/O, no async, no runtime calls.

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::domain::error::{ConfigError, FleetError};

/// Node names are `comp{i}`; teardown discovers nodes by this prefix.
pub const NODE_NAME_PREFIX: &str = "comp";

/// External SSH port of node `i` is `BASE_PORT + i`.
pub const BASE_PORT: u16 = 2221;

/// Host octet of node `i` is `HOST_OCTET_OFFSET + i`.
pub const HOST_OCTET_OFFSET: u8 = 10;

/// Largest fleet that fits the last octet without reaching the broadcast address.
pub const MAX_NODES: u32 = 244;

// ── FleetSpec ─────────────────────────────────────────────────────────────────

/// Requested fleet size, validated once at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetSpec {
    size: u32,
}

impl FleetSpec {
    /// Parse operator input into a fleet size.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::InvalidSpec` for non-integers, values ≤ 0, and
    /// values above [`MAX_NODES`].
    pub fn parse(input: &str) -> Result<Self, FleetError> {
        let trimmed = input.trim();
        let n: i64 = trimmed
            .parse()
            .map_err(|_| FleetError::invalid_spec(input, "must be a positive integer"))?;
        if n <= 0 {
            return Err(FleetError::invalid_spec(input, "must be a positive integer"));
        }
        Self::new(u32::try_from(n).unwrap_or(u32::MAX))
            .map_err(|_| FleetError::invalid_spec(input, format!("at most {MAX_NODES} nodes fit the address plan")))
    }

    /// # Errors
    ///
    /// Returns `FleetError::InvalidSpec` when `size` is 0 or above [`MAX_NODES`].
    pub fn new(size: u32) -> Result<Self, FleetError> {
        if size == 0 {
            return Err(FleetError::invalid_spec("0", "must be a positive integer"));
        }
        if size > MAX_NODES {
            return Err(FleetError::invalid_spec(
                &size.to_string(),
                format!("at most {MAX_NODES} nodes fit the address plan"),
            ));
        }
        Ok(Self { size })
    }

    #[must_use]
    pub fn size(self) -> u32 {
        self.size
    }
}

// ── NetworkPlan ───────────────────────────────────────────────────────────────

/// The isolated network a fleet lives on: `{prefix}.0.0/16`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    name: String,
    prefix: [u8; 2],
}

impl NetworkPlan {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPrefix` unless `prefix` is two dotted octets.
    pub fn new(name: &str, prefix: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.to_string(),
            prefix: parse_prefix(prefix)?,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subnet in CIDR notation, e.g. `172.28.0.0/16`.
    #[must_use]
    pub fn subnet(&self) -> String {
        format!("{}.{}.0.0/16", self.prefix[0], self.prefix[1])
    }

    #[must_use]
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.prefix[0], self.prefix[1], 0, 1)
    }

    /// Address and external port for node `index`.
    ///
    /// Callers validate the index range through [`FleetSpec`]; an index past
    /// [`MAX_NODES`] saturates rather than wrapping.
    #[must_use]
    pub fn allocate(&self, index: u32) -> (Ipv4Addr, u16) {
        let octet = u8::try_from(index)
            .unwrap_or(u8::MAX)
            .saturating_add(HOST_OCTET_OFFSET);
        let port = BASE_PORT.saturating_add(u16::try_from(index).unwrap_or(u16::MAX));
        (
            Ipv4Addr::new(self.prefix[0], self.prefix[1], 0, octet),
            port,
        )
    }

    /// Returns `true` if `addr` is a node address this plan could hand out.
    #[must_use]
    pub fn is_node_address(&self, addr: &str) -> bool {
        let Ok(ip) = addr.parse::<Ipv4Addr>() else {
            return false;
        };
        let [a, b, c, d] = ip.octets();
        a == self.prefix[0]
            && b == self.prefix[1]
            && c == 0
            && d > HOST_OCTET_OFFSET
            && u32::from(d - HOST_OCTET_OFFSET) <= MAX_NODES
    }
}

fn parse_prefix(prefix: &str) -> Result<[u8; 2], ConfigError> {
    let invalid = || ConfigError::InvalidPrefix(prefix.to_string());
    let mut parts = prefix.split('.');
    let a = parts.next().and_then(|p| p.parse::<u8>().ok()).ok_or_else(invalid)?;
    let b = parts.next().and_then(|p| p.parse::<u8>().ok()).ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok([a, b])
}

// ── NodeIdentity / Topology ──────────────────────────────────────────────────

/// Deterministic identity of node `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub index: u32,
    pub name: String,
    pub address: Ipv4Addr,
    pub port: u16,
}

impl NodeIdentity {
    #[must_use]
    pub fn new(plan: &NetworkPlan, index: u32) -> Self {
        let (address, port) = plan.allocate(index);
        Self {
            index,
            name: node_name(index),
            address,
            port,
        }
    }

    /// Ordinal alias peers may use instead of the hostname or address.
    #[must_use]
    pub fn alias(&self) -> String {
        node_name(self.index)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, port {})", self.name, self.address, self.port)
    }
}

/// Name of node `index` under the fleet naming convention.
#[must_use]
pub fn node_name(index: u32) -> String {
    format!("{NODE_NAME_PREFIX}{index}")
}

/// Index encoded in a convention node name, e.g. `comp12` → `12`.
///
/// Returns `None` for anything that is not exactly `comp` followed by digits,
/// so unrelated containers such as `compiler` are never matched.
#[must_use]
pub fn parse_node_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(NODE_NAME_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|i| *i >= 1)
}

/// Ordered node identities `1..=N` for one fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    nodes: Vec<NodeIdentity>,
}

impl Topology {
    #[must_use]
    pub fn new(plan: &NetworkPlan, spec: FleetSpec) -> Self {
        Self {
            nodes: (1..=spec.size()).map(|i| NodeIdentity::new(plan, i)).collect(),
        }
    }

    /// Topology restricted to the given nodes, kept in index order.
    #[must_use]
    pub fn from_nodes(mut nodes: Vec<NodeIdentity>) -> Self {
        nodes.sort_by_key(|n| n.index);
        Self { nodes }
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeIdentity] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&NodeIdentity> {
        self.nodes.iter().find(|n| n.index == index)
    }

    /// Every node except `node`, in index order.
    pub fn peers_of<'a>(&'a self, node: &'a NodeIdentity) -> impl Iterator<Item = &'a NodeIdentity> {
        self.nodes.iter().filter(move |n| n.index != node.index)
    }
}
