//! Command implementations

pub mod config;
pub mod provision;
pub mod teardown;
pub mod verify;
pub mod version;

use clap::builder::TypedValueParser as _;

use crate::domain::FleetSpec;

/// Parse a fleet size argument; rejects anything but an integer in 1..=244.
#[must_use]
pub fn fleet_spec_parser() -> impl clap::builder::TypedValueParser<Value = FleetSpec> {
    clap::builder::NonEmptyStringValueParser::new()
        .try_map(|raw| FleetSpec::parse(&raw).map_err(|e| e.to_string()))
}
