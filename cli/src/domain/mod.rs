//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`
//! sockets. All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod image;
pub mod paths;
pub mod report;
pub mod topology;
pub mod trust;

pub use config::FleetConfig;
pub use error::{ConfigError, FleetError};
pub use paths::FleetPaths;
pub use report::{
    ConnectivityCheck, FailureRecord, NodeReport, NodeStatus, ProvisionPhase, ProvisionReport,
    TeardownReport, TrustRestore, VerifyReport,
};
pub use topology::{FleetSpec, NetworkPlan, NodeIdentity, Topology};
pub use trust::{HostIdentity, TrustMap};
