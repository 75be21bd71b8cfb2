//! Shared fixtures for integration tests.

#![allow(dead_code)]

use power_group::group::SubtractAggregator;
use power_group::sensor::GroupSensor;
use power_group::state::{EntityId, RawValue, SourceState};
use rust_decimal::Decimal;

pub const BASE: &str = "base";
pub const SUBTRACT1: &str = "subtract1";
pub const SUBTRACT2: &str = "subtract2";

/// Subtract aggregator over `base` minus `subtract1` and `subtract2`.
pub fn scenario_aggregator() -> SubtractAggregator {
    SubtractAggregator::new(BASE, vec![SUBTRACT1.to_string(), SUBTRACT2.to_string()])
}

/// Same group wrapped in a sensor shell with default precision.
pub fn scenario_sensor() -> GroupSensor {
    GroupSensor::new("Scenario", "pc_subtract_base", Box::new(scenario_aggregator()))
}

/// Snapshot with base=100, subtract1=20, subtract2=30.
pub fn full_snapshot() -> Vec<(EntityId, RawValue)> {
    vec![
        (BASE.to_string(), RawValue::new("100")),
        (SUBTRACT1.to_string(), RawValue::new("20")),
        (SUBTRACT2.to_string(), RawValue::new("30")),
    ]
}

/// `full_snapshot` as host states, for the sensor shell.
pub fn full_snapshot_states() -> Vec<(EntityId, SourceState)> {
    full_snapshot()
        .into_iter()
        .map(|(id, raw)| (id, SourceState::Value(raw)))
        .collect()
}

pub fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

/// Path of a file under the crate's `groups/` directory.
pub fn group_file(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("groups")
        .join(name)
}
