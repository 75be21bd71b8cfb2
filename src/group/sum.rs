//! Sum group: the total of every known member reading.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::warn;

use super::{Aggregate, Aggregator, SourceCache, checked_total};
use crate::state::{EntityId, RawValue, SourceState, UnitOfPower};

/// Sums the last known readings of all members.
///
/// With no known member the aggregate is unknown, unless
/// `ignore_unavailable_state` is set, in which case it is zero. A total
/// outside the `Decimal` range is unknown.
#[derive(Debug, Clone)]
pub struct SumAggregator {
    entities: Vec<EntityId>,
    ignore_unavailable_state: bool,
    cache: SourceCache,
}

impl SumAggregator {
    pub fn new(entities: Vec<EntityId>, ignore_unavailable_state: bool) -> Self {
        Self {
            entities,
            ignore_unavailable_state,
            cache: SourceCache::new(UnitOfPower::Watt),
        }
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    fn compute_sum(&self) -> Aggregate {
        if self.cache.is_empty() {
            if self.ignore_unavailable_state {
                return Aggregate::Numeric(Decimal::ZERO);
            }
            return Aggregate::Unknown;
        }
        match checked_total(self.cache.values()) {
            Some(total) => Aggregate::Numeric(total),
            None => {
                warn!(members = self.entities.len(), "sum out of range");
                Aggregate::Unknown
            }
        }
    }
}

impl Aggregator for SumAggregator {
    fn initialize(&mut self, available: &[(EntityId, RawValue)]) -> Aggregate {
        self.cache.load(available);
        self.compute_sum()
    }

    fn update(&mut self, entity_id: &str, state: &SourceState) -> Aggregate {
        self.cache.apply(entity_id, state);
        self.compute_sum()
    }

    fn aggregate(&self) -> Aggregate {
        self.compute_sum()
    }

    fn tracked_entities(&self) -> BTreeSet<EntityId> {
        self.entities.iter().cloned().collect()
    }

    fn kind(&self) -> &'static str {
        "sum"
    }
}
