//! Host identities, the fleet trust map, and `known_hosts` text rules.
//!
//! Pure functions only. Reading and writing trust stores happens in
//! `crate::infra::known_hosts`; this module decides what the content is.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::domain::topology::{BASE_PORT, MAX_NODES, NetworkPlan, NodeIdentity, parse_node_name};

/// Path of the node's ed25519 host public key inside the image.
pub const HOST_KEY_PATH: &str = "/etc/ssh/ssh_host_ed25519_key.pub";

/// Validates that `key` is an ed25519 public key with non-empty key material.
///
/// Accepts the raw public key format: `ssh-ed25519 <base64-material>`.
///
/// # Errors
///
/// Returns an error if the key does not start with `ssh-ed25519 ` or has no
/// key material after the prefix.
pub fn validate_host_key(key: &str) -> Result<()> {
    let material = key
        .strip_prefix("ssh-ed25519 ")
        .ok_or_else(|| anyhow::anyhow!("host key must be an ed25519 key (got: {key:?})"))?;
    anyhow::ensure!(!material.trim().is_empty(), "host key has no key material");
    Ok(())
}

/// Validates that a public key has a safe format for use in shell commands.
///
/// # Errors
///
/// Returns an error if the key type is not ed25519/rsa or the line contains
/// characters outside the base64 and comment alphabet.
pub fn validate_pubkey(key: &str) -> Result<()> {
    anyhow::ensure!(
        key.starts_with("ssh-ed25519 ") || key.starts_with("ssh-rsa "),
        "invalid public key format"
    );
    anyhow::ensure!(
        key.chars()
            .all(|c| c.is_ascii_alphanumeric() || " +/=@.-_\n".contains(c)),
        "public key contains invalid characters"
    );
    Ok(())
}

/// Operator-side principal for a node's published port, in `known_hosts` form.
#[must_use]
pub fn operator_principal(port: u16) -> String {
    format!("[localhost]:{port}")
}

// ── HostIdentity ──────────────────────────────────────────────────────────────

/// A live node's SSH host identity as harvested from the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub node: String,
    pub alias: String,
    pub address: Ipv4Addr,
    pub port: u16,
    /// `ssh-ed25519 <material>` with any trailing comment removed.
    pub host_key: String,
}

impl HostIdentity {
    /// Build an identity from the raw contents of the node's host key file.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is empty or not an ed25519 public key.
    pub fn from_harvest(node: &NodeIdentity, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        anyhow::ensure!(!trimmed.is_empty(), "empty host key");
        let mut fields = trimmed.split_whitespace();
        let key = match (fields.next(), fields.next()) {
            (Some(kind), Some(material)) => format!("{kind} {material}"),
            _ => trimmed.to_string(),
        };
        validate_host_key(&key)?;
        Ok(Self {
            node: node.name.clone(),
            alias: node.alias(),
            address: node.address,
            port: node.port,
            host_key: key,
        })
    }

    /// `SHA256:<base64>` fingerprint, as printed by `ssh-keygen -l`.
    #[must_use]
    pub fn fingerprint(&self) -> Option<String> {
        let material = self.host_key.split_whitespace().nth(1)?;
        let blob = STANDARD.decode(material).ok()?;
        let digest = Sha256::digest(&blob);
        Some(format!("SHA256:{}", STANDARD_NO_PAD.encode(digest)))
    }

    #[must_use]
    pub fn operator_principal(&self) -> String {
        operator_principal(self.port)
    }
}

// ── TrustMap ──────────────────────────────────────────────────────────────────

/// The three ways a peer may address a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalForm {
    Name,
    Address,
    Alias,
}

/// One principal → host key binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub principal: String,
    pub form: PrincipalForm,
    pub node: String,
    pub host_key: String,
}

/// Node-side trust bindings, three per harvested node.
///
/// Inserting a binding purges every existing binding for the same principal
/// that carries a different key, so no principal ever maps to two keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustMap {
    bindings: BTreeMap<(PrincipalForm, String), Binding>,
}

impl TrustMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_identities(identities: &[HostIdentity]) -> Self {
        let mut map = Self::new();
        for identity in identities {
            map.insert_identity(identity);
        }
        map
    }

    /// Bind `identity`'s key under its name, address, and alias.
    pub fn insert_identity(&mut self, identity: &HostIdentity) {
        for (form, principal) in [
            (PrincipalForm::Name, identity.node.clone()),
            (PrincipalForm::Address, identity.address.to_string()),
            (PrincipalForm::Alias, identity.alias.clone()),
        ] {
            self.insert(Binding {
                principal,
                form,
                node: identity.node.clone(),
                host_key: identity.host_key.clone(),
            });
        }
    }

    pub fn insert(&mut self, binding: Binding) {
        self.bindings.retain(|_, existing| {
            existing.principal != binding.principal || existing.host_key == binding.host_key
        });
        self.bindings
            .insert((binding.form, binding.principal.clone()), binding);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Host key bound to `principal`, if any.
    #[must_use]
    pub fn key_for(&self, principal: &str) -> Option<&str> {
        self.bindings
            .values()
            .find(|b| b.principal == principal)
            .map(|b| b.host_key.as_str())
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Node names with at least one binding.
    #[must_use]
    pub fn pinned_nodes(&self) -> BTreeSet<&str> {
        self.bindings.values().map(|b| b.node.as_str()).collect()
    }

    /// Render as a complete `known_hosts` file.
    ///
    /// Identical `principal key` lines are written once; when a node's name
    /// and alias coincide they share a line.
    #[must_use]
    pub fn render_known_hosts(&self) -> String {
        let lines: BTreeSet<String> = self
            .bindings
            .values()
            .map(|b| format!("{} {}", b.principal, b.host_key))
            .collect();
        let mut out = String::new();
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

// ── known_hosts text rules ────────────────────────────────────────────────────

/// One entry of a `known_hosts` host list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEntry<'a> {
    Plain(&'a str),
    /// `|1|salt|hash`, written when `HashKnownHosts` is on.
    Hashed { salt: &'a str, hash: &'a str },
}

impl<'a> HostEntry<'a> {
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        if let Some((salt, hash)) = raw.strip_prefix("|1|").and_then(|r| r.split_once('|')) {
            return Self::Hashed { salt, hash };
        }
        Self::Plain(raw)
    }

    /// `true` when this entry names `principal`.
    #[must_use]
    pub fn matches(&self, principal: &str) -> bool {
        match *self {
            Self::Plain(host) => host == principal,
            Self::Hashed { salt, hash } => hashed_host_matches(salt, hash, principal),
        }
    }
}

/// OpenSSH hashes a host name as HMAC-SHA1 keyed by the entry's salt.
fn hashed_host_matches(salt: &str, hash: &str, host: &str) -> bool {
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(hash)) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(&salt) else {
        return false;
    };
    mac.update(host.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Split a `known_hosts` line into (marker, host list, rest).
///
/// Returns `None` for comments and blank lines, which are passed through
/// untouched.
fn split_line(line: &str) -> Option<(Option<&str>, &str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (marker, body) = if trimmed.starts_with('@') {
        let (m, rest) = trimmed.split_once(char::is_whitespace)?;
        (Some(m), rest.trim_start())
    } else {
        (None, trimmed)
    };
    let (hosts, rest) = body.split_once(char::is_whitespace)?;
    Some((marker, hosts, rest.trim_start()))
}

/// Remove every host-list entry matching `is_target`, dropping lines whose
/// host list becomes empty. Returns the new content and the number of
/// principals removed.
#[must_use]
pub fn strip_principals(
    content: &str,
    is_target: impl Fn(&HostEntry<'_>) -> bool,
) -> (String, usize) {
    let mut out = String::with_capacity(content.len());
    let mut removed = 0;
    for line in content.lines() {
        let Some((marker, hosts, rest)) = split_line(line) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        let kept: Vec<&str> = hosts
            .split(',')
            .filter(|h| !is_target(&HostEntry::parse(h)))
            .collect();
        let dropped = hosts.split(',').count() - kept.len();
        if dropped == 0 {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        removed += dropped;
        if kept.is_empty() {
            continue;
        }
        if let Some(m) = marker {
            out.push_str(m);
            out.push(' ');
        }
        out.push_str(&kept.join(","));
        out.push(' ');
        out.push_str(rest);
        out.push('\n');
    }
    (out, removed)
}

/// Replace-not-append: purge `principal` everywhere, then add one fresh line.
#[must_use]
pub fn replace_principal(content: &str, principal: &str, host_key: &str) -> String {
    let (mut out, _) = strip_principals(content, |h| h.matches(principal));
    out.push_str(principal);
    out.push(' ');
    out.push_str(host_key);
    out.push('\n');
    out
}

/// Returns `true` for principals a fleet could have written: node names,
/// node addresses, and the operator-side `[localhost]:port` forms.
#[must_use]
pub fn is_cluster_principal(plan: &NetworkPlan, principal: &str) -> bool {
    if parse_node_name(principal).is_some() || plan.is_node_address(principal) {
        return true;
    }
    let Some(rest) = principal
        .strip_prefix("[localhost]:")
        .or_else(|| principal.strip_prefix("[127.0.0.1]:"))
    else {
        return false;
    };
    let Ok(port) = rest.parse::<u16>() else {
        return false;
    };
    let first = u32::from(BASE_PORT) + 1;
    (first..=u32::from(BASE_PORT) + MAX_NODES).contains(&u32::from(port))
}

/// Like [`is_cluster_principal`], but also recognises hashed entries by
/// trying every principal a fleet on `plan` could have written.
#[must_use]
pub fn is_cluster_entry(plan: &NetworkPlan, entry: &HostEntry<'_>) -> bool {
    match *entry {
        HostEntry::Plain(host) => is_cluster_principal(plan, host),
        HostEntry::Hashed { .. } => (1..=MAX_NODES).any(|i| {
            let node = NodeIdentity::new(plan, i);
            entry.matches(&node.name)
                || entry.matches(&node.address.to_string())
                || entry.matches(&operator_principal(node.port))
                || entry.matches(&format!("[127.0.0.1]:{}", node.port))
        }),
    }
}
