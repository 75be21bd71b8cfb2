//! Seeded synthetic state-change stream for a mains meter and appliances.

use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;

use crate::config::{DemoConfig, GroupConfig, GroupType};
use crate::replay::StateEvent;
use crate::state::{EntityId, RawValue, SourceState};

/// Generator of plausible power readings.
///
/// The mains meter reports in kW and always covers the appliances' current
/// draw plus a random household baseline; appliances report in W. Any event
/// may instead report `unavailable`. Output is deterministic for a seed.
///
/// # Examples
///
/// ```
/// use power_group::config::GroupConfig;
/// use power_group::demo::DemoStream;
///
/// let cfg = GroupConfig::demo();
/// let mut a = DemoStream::from_config(&cfg);
/// let mut b = DemoStream::from_config(&cfg);
/// assert_eq!(a.events(10), b.events(10));
/// ```
#[derive(Debug, Clone)]
pub struct DemoStream {
    mains: Option<EntityId>,
    appliances: Vec<EntityId>,
    /// Current appliance draw in tenths of a watt; zero while unavailable.
    draws: Vec<i64>,
    unavailable_probability: f64,
    baseline_max_w: u32,
    appliance_max_w: u32,
    rng: StdRng,
}

impl DemoStream {
    /// Creates a generator for an optional mains meter and a set of appliances.
    pub fn new(mains: Option<EntityId>, appliances: Vec<EntityId>, cfg: &DemoConfig) -> Self {
        let draws = vec![0; appliances.len()];
        Self {
            mains,
            appliances,
            draws,
            unavailable_probability: cfg.unavailable_probability.clamp(0.0, 1.0),
            baseline_max_w: cfg.baseline_max_w,
            appliance_max_w: cfg.appliance_max_w.max(1),
            rng: StdRng::seed_from_u64(cfg.seed),
        }
    }

    /// Maps a group onto the generator: a subtract group's base is the mains
    /// meter, every other member is an appliance.
    pub fn from_config(cfg: &GroupConfig) -> Self {
        let g = &cfg.group;
        match g.kind {
            GroupType::Subtract => Self::new(
                Some(g.base_entity.clone()),
                g.subtract_entities.clone(),
                &cfg.demo,
            ),
            GroupType::Sum => Self::new(None, g.entities.clone(), &cfg.demo),
        }
    }

    /// Reports a reading for every source.
    pub fn snapshot(&mut self) -> Vec<(EntityId, SourceState)> {
        let mut states = Vec::with_capacity(self.appliances.len() + 1);
        for i in 0..self.appliances.len() {
            states.push(self.appliance_reading(i));
        }
        if let Some(mains) = self.mains_reading() {
            states.push(mains);
        }
        states
    }

    /// Generates `steps` single-source state changes.
    pub fn events(&mut self, steps: usize) -> Vec<StateEvent> {
        let sources = self.appliances.len() + usize::from(self.mains.is_some());
        if sources == 0 {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(steps);
        for _ in 0..steps {
            let idx = self.rng.random_range(0..sources);
            let unavailable = self.rng.random_bool(self.unavailable_probability);
            let (entity_id, state) = match (idx < self.appliances.len(), unavailable) {
                (true, true) => {
                    self.draws[idx] = 0;
                    (self.appliances[idx].clone(), SourceState::Unavailable)
                }
                (true, false) => self.appliance_reading(idx),
                (false, true) => match &self.mains {
                    Some(mains) => (mains.clone(), SourceState::Unavailable),
                    None => continue,
                },
                (false, false) => match self.mains_reading() {
                    Some(reading) => reading,
                    None => continue,
                },
            };
            events.push(StateEvent { entity_id, state });
        }
        events
    }

    fn appliance_reading(&mut self, idx: usize) -> (EntityId, SourceState) {
        let tenths = self
            .rng
            .random_range(0..=i64::from(self.appliance_max_w) * 10);
        self.draws[idx] = tenths;
        let state = SourceState::Value(RawValue::with_unit(
            Decimal::new(tenths, 1).to_string(),
            "W",
        ));
        (self.appliances[idx].clone(), state)
    }

    fn mains_reading(&mut self) -> Option<(EntityId, SourceState)> {
        let mains = self.mains.clone()?;
        let baseline = self
            .rng
            .random_range(0..=i64::from(self.baseline_max_w) * 10);
        let total_tenths: i64 = self.draws.iter().sum::<i64>() + baseline;
        // tenths of a watt -> kW with four decimals
        let kw = Decimal::new(total_tenths, 4);
        Some((
            mains,
            SourceState::Value(RawValue::with_unit(kw.to_string(), "kW")),
        ))
    }
}
