//! Publishing shell around an aggregation strategy.
//!
//! [`GroupSensor`] owns the concerns of a visible sensor (name, ids, unit,
//! display precision, availability, member filtering) and delegates all
//! arithmetic to a boxed [`Aggregator`].

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{GroupSection, GroupType};
use crate::group::{Aggregate, Aggregator, SubtractAggregator, SumAggregator};
use crate::state::{EntityId, RawValue, SourceState};

/// Value currently published by a group sensor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorState {
    /// Value rounded and padded to the sensor precision; last known value
    /// while unknown.
    pub value: Option<Decimal>,
    /// Unrounded aggregate behind `value`.
    pub exact: Option<Decimal>,
    /// Whether the host should show the sensor as available.
    pub available: bool,
}

/// A grouped power sensor publishing the result of one aggregation strategy.
pub struct GroupSensor {
    name: String,
    unique_id: String,
    entity_id: Option<EntityId>,
    precision: u32,
    ignore_unavailable_state: bool,
    members: BTreeSet<EntityId>,
    aggregator: Box<dyn Aggregator>,
    state: SensorState,
}

impl GroupSensor {
    /// Creates a sensor around `aggregator` with precision 2.
    pub fn new(
        name: impl Into<String>,
        unique_id: impl Into<String>,
        aggregator: Box<dyn Aggregator>,
    ) -> Self {
        let members = aggregator.tracked_entities();
        Self {
            name: name.into(),
            unique_id: unique_id.into(),
            entity_id: None,
            precision: 2,
            ignore_unavailable_state: false,
            members,
            aggregator,
            state: SensorState::default(),
        }
    }

    /// Builds the sensor and its strategy from a `[group]` section.
    pub fn from_config(cfg: &GroupSection) -> Self {
        let (aggregator, default_unique_id): (Box<dyn Aggregator>, String) = match cfg.kind {
            GroupType::Subtract => (
                Box::new(SubtractAggregator::new(
                    cfg.base_entity.clone(),
                    cfg.subtract_entities.clone(),
                )),
                format!("pc_subtract_{}", cfg.base_entity),
            ),
            GroupType::Sum => (
                Box::new(SumAggregator::new(
                    cfg.entities.clone(),
                    cfg.ignore_unavailable_state,
                )),
                format!("pc_group_{}", slugify(&cfg.name)),
            ),
        };
        let unique_id = cfg.unique_id.clone().unwrap_or(default_unique_id);

        let mut sensor = Self::new(cfg.name.clone(), unique_id, aggregator)
            .with_precision(cfg.precision)
            .with_ignore_unavailable_state(cfg.ignore_unavailable_state);
        if let Some(entity_id) = &cfg.entity_id {
            sensor = sensor.with_entity_id(entity_id.clone());
        }
        sensor
    }

    /// Sets the sensor's own entity id and drops it from the member set, so
    /// the group never listens to itself.
    pub fn with_entity_id(mut self, entity_id: impl Into<EntityId>) -> Self {
        let entity_id = entity_id.into();
        self.members.remove(&entity_id);
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_ignore_unavailable_state(mut self, ignore: bool) -> Self {
        self.ignore_unavailable_state = ignore;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Entities the host should deliver state changes for.
    pub fn members(&self) -> &BTreeSet<EntityId> {
        &self.members
    }

    pub fn kind(&self) -> &'static str {
        self.aggregator.kind()
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// Seeds the strategy from the host's current member states.
    ///
    /// Members in a sentinel state are left out of the snapshot, as are
    /// states of entities that are not members.
    pub fn initial_update(&mut self, snapshot: &[(EntityId, SourceState)]) -> &SensorState {
        let available: Vec<(EntityId, RawValue)> = snapshot
            .iter()
            .filter(|(id, _)| self.members.contains(id))
            .filter_map(|(id, state)| match state {
                SourceState::Value(raw) => Some((id.clone(), raw.clone())),
                SourceState::Unknown | SourceState::Unavailable => None,
            })
            .collect();
        debug!(
            sensor = %self.name,
            available = available.len(),
            members = self.members.len(),
            "initial update"
        );
        let aggregate = self.aggregator.initialize(&available);
        self.publish(aggregate)
    }

    /// Handles a state change of one entity.
    ///
    /// Returns `None` without touching the strategy when the entity is not a
    /// member of this group.
    pub fn on_state_change(
        &mut self,
        entity_id: &str,
        state: &SourceState,
    ) -> Option<&SensorState> {
        if !self.members.contains(entity_id) {
            debug!(sensor = %self.name, entity_id, "ignoring non-member state change");
            return None;
        }
        let aggregate = self.aggregator.update(entity_id, state);
        debug!(sensor = %self.name, entity_id, %state, %aggregate, "recomputed");
        Some(self.publish(aggregate))
    }

    fn publish(&mut self, aggregate: Aggregate) -> &SensorState {
        let was_available = self.state.available;
        match aggregate {
            Aggregate::Numeric(exact) => {
                self.state.exact = Some(exact);
                let mut published = exact.round_dp(self.precision);
                // pad so 100 publishes as 100.00 at precision 2
                published.rescale(self.precision);
                self.state.value = Some(published);
                self.state.available = true;
            }
            Aggregate::Unknown => {
                self.state.available = self.ignore_unavailable_state;
            }
        }
        if was_available != self.state.available {
            info!(
                sensor = %self.name,
                available = self.state.available,
                "availability changed"
            );
        }
        &self.state
    }
}

impl fmt::Debug for GroupSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSensor")
            .field("name", &self.name)
            .field("unique_id", &self.unique_id)
            .field("entity_id", &self.entity_id)
            .field("kind", &self.aggregator.kind())
            .field("members", &self.members)
            .field("state", &self.state)
            .finish()
    }
}

/// Lowercases `name` and collapses every run of non-alphanumerics into `_`.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}
