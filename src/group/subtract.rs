//! Subtract group: the base reading minus every subtracted reading.

use std::collections::BTreeSet;

use tracing::warn;

use super::{Aggregate, Aggregator, SourceCache, checked_total};
use crate::state::{EntityId, RawValue, SourceState, UnitOfPower};

/// Derives `base - Σ subtracted` from the last known source readings.
///
/// A missing base makes the aggregate [`Aggregate::Unknown`]; a missing
/// subtracted source contributes zero. A result outside the `Decimal` range
/// is unknown as well.
///
/// # Examples
///
/// ```
/// use power_group::group::{Aggregate, Aggregator, SubtractAggregator};
/// use power_group::state::RawValue;
/// use rust_decimal::Decimal;
///
/// let mut group = SubtractAggregator::new(
///     "sensor.mains",
///     vec!["sensor.heat_pump".to_string()],
/// );
/// let result = group.initialize(&[
///     ("sensor.mains".to_string(), RawValue::new("1500")),
///     ("sensor.heat_pump".to_string(), RawValue::new("600")),
/// ]);
/// assert_eq!(result, Aggregate::Numeric(Decimal::from(900)));
/// ```
#[derive(Debug, Clone)]
pub struct SubtractAggregator {
    base_id: EntityId,
    subtract_ids: Vec<EntityId>,
    cache: SourceCache,
}

impl SubtractAggregator {
    /// Creates a subtract aggregator with watts as the native unit.
    ///
    /// # Arguments
    ///
    /// * `base_id` - The minuend entity
    /// * `subtract_ids` - Entities deducted from the base; may be empty, in
    ///   which case the base passes through unchanged
    pub fn new(base_id: impl Into<EntityId>, subtract_ids: Vec<EntityId>) -> Self {
        Self::with_unit(base_id, subtract_ids, UnitOfPower::Watt)
    }

    /// Creates a subtract aggregator producing values in `native_unit`.
    pub fn with_unit(
        base_id: impl Into<EntityId>,
        subtract_ids: Vec<EntityId>,
        native_unit: UnitOfPower,
    ) -> Self {
        Self {
            base_id: base_id.into(),
            subtract_ids,
            cache: SourceCache::new(native_unit),
        }
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    pub fn subtract_ids(&self) -> &[EntityId] {
        &self.subtract_ids
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Computes the aggregate from the full current cache.
    pub fn compute_aggregate(&self) -> Aggregate {
        let Some(base) = self.cache.get(&self.base_id) else {
            return Aggregate::Unknown;
        };
        let subtracted =
            checked_total(self.subtract_ids.iter().filter_map(|id| self.cache.get(id)));
        match subtracted.and_then(|s| base.checked_sub(s)) {
            Some(result) => Aggregate::Numeric(result),
            None => {
                warn!(base_id = %self.base_id, "subtraction out of range");
                Aggregate::Unknown
            }
        }
    }
}

impl Aggregator for SubtractAggregator {
    fn initialize(&mut self, available: &[(EntityId, RawValue)]) -> Aggregate {
        self.cache.load(available);
        self.compute_aggregate()
    }

    fn update(&mut self, entity_id: &str, state: &SourceState) -> Aggregate {
        self.cache.apply(entity_id, state);
        self.compute_aggregate()
    }

    fn aggregate(&self) -> Aggregate {
        self.compute_aggregate()
    }

    fn tracked_entities(&self) -> BTreeSet<EntityId> {
        std::iter::once(&self.base_id)
            .chain(&self.subtract_ids)
            .cloned()
            .collect()
    }

    fn kind(&self) -> &'static str {
        "subtract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn n(v: i64) -> Aggregate {
        Aggregate::Numeric(Decimal::from(v))
    }

    fn raw(id: &str, v: &str) -> (EntityId, RawValue) {
        (id.to_string(), RawValue::new(v))
    }

    fn group() -> SubtractAggregator {
        SubtractAggregator::new(
            "base",
            vec!["subtract1".to_string(), "subtract2".to_string()],
        )
    }

    #[test]
    fn missing_base_is_unknown_even_with_subtrahends() {
        let mut g = group();
        let r = g.initialize(&[raw("subtract1", "20"), raw("subtract2", "30")]);
        assert_eq!(r, Aggregate::Unknown);
    }

    #[test]
    fn missing_subtrahend_counts_as_zero() {
        let mut g = group();
        assert_eq!(g.initialize(&[raw("base", "100"), raw("subtract1", "20")]), n(80));
    }

    #[test]
    fn base_transitions_between_unknown_and_numeric() {
        let mut g = group();
        assert_eq!(g.initialize(&[]), Aggregate::Unknown);
        assert_eq!(g.update("base", &SourceState::value("10")), n(10));
        assert_eq!(g.update("base", &SourceState::Unknown), Aggregate::Unknown);
        assert_eq!(g.update("subtract1", &SourceState::value("4")), Aggregate::Unknown);
        assert_eq!(g.update("base", &SourceState::value("10")), n(6));
    }

    #[test]
    fn result_may_go_negative() {
        let mut g = group();
        let r = g.initialize(&[raw("base", "10"), raw("subtract1", "25")]);
        assert_eq!(r, n(-15));
    }

    #[test]
    fn unconvertible_base_is_unknown() {
        let mut g = group();
        g.initialize(&[raw("base", "100")]);
        assert_eq!(g.update("base", &SourceState::value("garbage")), Aggregate::Unknown);
    }

    #[test]
    fn untracked_update_is_cached_but_inert() {
        let mut g = group();
        g.initialize(&[raw("base", "100")]);
        assert_eq!(g.update("sensor.other", &SourceState::value("99")), n(100));
        assert!(g.cache().contains("sensor.other"));
    }

    #[test]
    fn mixed_units_are_converted_before_subtracting() {
        let mut g = group();
        let r = g.initialize(&[
            ("base".to_string(), RawValue::with_unit("1.5", "kW")),
            ("subtract1".to_string(), RawValue::new("250.25")),
        ]);
        assert_eq!(r.value().map(|v| v.to_string()), Some("1249.75".to_string()));
    }

    #[test]
    fn decimal_subtraction_does_not_drift() {
        let mut g = SubtractAggregator::new("base", vec!["s".to_string()]);
        g.initialize(&[raw("base", "0.3")]);
        for _ in 0..1000 {
            g.update("s", &SourceState::value("0.1"));
            g.update("s", &SourceState::value("0.2"));
        }
        assert_eq!(g.aggregate().value().map(|v| v.normalize().to_string()), Some("0.1".to_string()));
    }

    const MAX: &str = "79228162514264337593543950335";

    #[test]
    fn overflowing_subtraction_is_unknown() {
        let mut g = SubtractAggregator::new("base", vec!["s".to_string()]);
        assert_eq!(g.initialize(&[raw("base", MAX)]), Aggregate::Numeric(Decimal::MAX));
        assert_eq!(g.update("s", &SourceState::value("-1")), Aggregate::Unknown);
        assert_eq!(
            g.update("s", &SourceState::value("1")).value(),
            Some(Decimal::MAX - Decimal::ONE)
        );
    }

    #[test]
    fn overflowing_subtrahend_total_is_unknown() {
        let mut g = group();
        let r = g.initialize(&[
            raw("base", "0"),
            raw("subtract1", MAX),
            raw("subtract2", MAX),
        ]);
        assert_eq!(r, Aggregate::Unknown);
    }

    #[test]
    fn opposite_extremes_cancel_in_any_order() {
        let forward = SubtractAggregator::new("base", vec!["a".to_string(), "b".to_string()]);
        let backward = SubtractAggregator::new("base", vec!["b".to_string(), "a".to_string()]);
        let snapshot = [raw("base", "-1"), raw("a", MAX), raw("b", &format!("-{MAX}"))];
        for mut g in [forward, backward] {
            assert_eq!(g.initialize(&snapshot), n(-1));
        }
    }

    #[test]
    fn tracked_entities_union_base_and_subtrahends() {
        let g = SubtractAggregator::new("base", vec!["a".to_string(), "a".to_string()]);
        let tracked: Vec<_> = g.tracked_entities().into_iter().collect();
        assert_eq!(tracked, vec!["a".to_string(), "base".to_string()]);
    }
}
