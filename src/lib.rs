//! Grouped power sensors: incremental subtract and sum aggregation over the
//! states of tracked entities.

pub mod config;
/// Seeded synthetic event streams.
pub mod demo;
pub mod error;
/// Aggregation strategies and their per-source cache.
pub mod group;
pub mod io;
pub mod replay;
pub mod report;
pub mod sensor;
pub mod state;
pub mod telemetry;

pub use error::{Error, Result};
