//! Aggregation strategies for grouped power sensors.
//!
//! An [`Aggregator`] owns a cache of the last known native value of every
//! source it has heard about and derives a fresh [`Aggregate`] from that
//! cache after each change. Aggregators never fail: sentinel states and
//! unconvertible readings simply leave a source absent.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;

use crate::state::{EntityId, RawValue, SourceState};

/// Per-source cache of last known readings.
pub mod cache;
pub mod subtract;
pub mod sum;

pub use cache::SourceCache;
pub use subtract::SubtractAggregator;
pub use sum::SumAggregator;

/// Result of an aggregation: a number, or unknown when it cannot be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Numeric(Decimal),
    Unknown,
}

impl Aggregate {
    /// Returns the numeric value, if any.
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Unknown => None,
        }
    }

}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Adds up `values`, returning `None` when the total leaves the `Decimal`
/// range.
///
/// Positive and negative terms are accumulated apart, so whether the total
/// overflows does not depend on iteration order.
pub(crate) fn checked_total(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    let mut positive = Decimal::ZERO;
    let mut negative = Decimal::ZERO;
    for v in values {
        if v.is_sign_negative() {
            negative = negative.checked_add(v)?;
        } else {
            positive = positive.checked_add(v)?;
        }
    }
    positive.checked_add(negative)
}

/// Common interface of the grouping strategies.
///
/// Implementations hold their own cache exclusively; callers serialize all
/// calls through one owner (`&mut self`).
pub trait Aggregator {
    /// Rebuilds the cache from the sources that currently have a usable
    /// reading and returns the aggregate.
    ///
    /// # Arguments
    ///
    /// * `available` - `(entity_id, raw value)` pairs; sources not listed are
    ///   treated as absent
    fn initialize(&mut self, available: &[(EntityId, RawValue)]) -> Aggregate;

    /// Applies one source's state change and returns the new aggregate.
    ///
    /// Sentinel states remove the source from the cache, readings replace
    /// any previous value. The entity id is not checked against the tracked
    /// set.
    fn update(&mut self, entity_id: &str, state: &SourceState) -> Aggregate;

    /// Derives the aggregate from the current cache without changing it.
    fn aggregate(&self) -> Aggregate;

    /// Every entity id this strategy reads from.
    fn tracked_entities(&self) -> BTreeSet<EntityId>;

    /// Returns a short human-readable strategy name.
    fn kind(&self) -> &'static str;
}
