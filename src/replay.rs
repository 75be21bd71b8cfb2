//! Replays recorded state changes through a group sensor.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::sensor::GroupSensor;
use crate::state::{EntityId, SourceState};

/// One state change of one source entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEvent {
    pub entity_id: EntityId,
    pub state: SourceState,
}

impl StateEvent {
    pub fn new(entity_id: impl Into<EntityId>, state: SourceState) -> Self {
        Self {
            entity_id: entity_id.into(),
            state,
        }
    }
}

/// Event log row; extra columns such as a leading `seq` are ignored.
#[derive(Debug, Deserialize)]
struct EventRecord {
    entity_id: String,
    state: String,
    #[serde(default)]
    unit: Option<String>,
}

/// Reads an event log with header `entity_id,state[,unit]`.
///
/// # Errors
///
/// Returns [`crate::Error::Csv`] for malformed rows or missing columns.
pub fn read_events<R: Read>(reader: R) -> Result<Vec<StateEvent>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut events = Vec::new();
    for record in rdr.deserialize() {
        let record: EventRecord = record?;
        events.push(StateEvent {
            state: SourceState::parse(&record.state, record.unit.as_deref()),
            entity_id: record.entity_id,
        });
    }
    Ok(events)
}

/// Reads an event log from a file.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be opened, otherwise as
/// [`read_events`].
pub fn read_events_from_path(path: &Path) -> Result<Vec<StateEvent>> {
    let file = File::open(path)?;
    let events = read_events(file)?;
    info!(path = %path.display(), events = events.len(), "loaded event log");
    Ok(events)
}

/// Published sensor state after one replay step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRow {
    /// 0 for the initial snapshot, then 1.. per event.
    pub seq: usize,
    /// Entity that triggered the step; empty for the snapshot.
    pub entity_id: EntityId,
    /// Value published by the sensor (rounded).
    pub value: Option<Decimal>,
    pub available: bool,
    /// `false` when the event was for a non-member and was ignored.
    pub applied: bool,
}

impl fmt::Display for PublishedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .value
            .map_or_else(|| "-".to_string(), |v| format!("{v} W"));
        let entity: &str = if self.entity_id.is_empty() {
            "<snapshot>"
        } else {
            &self.entity_id
        };
        write!(
            f,
            "seq={:>4} | {:<40} | {:>14} | {}",
            self.seq,
            entity,
            value,
            if self.available { "available" } else { "unavailable" },
        )?;
        if !self.applied {
            write!(f, " (ignored)")?;
        }
        Ok(())
    }
}

/// Drives a [`GroupSensor`] through a snapshot and an ordered event list,
/// one event at a time.
pub struct Replay {
    sensor: GroupSensor,
}

impl Replay {
    pub fn new(sensor: GroupSensor) -> Self {
        Self { sensor }
    }

    /// Applies the snapshot, then every event in order, recording the
    /// published state after each step.
    pub fn run(
        &mut self,
        snapshot: &[(EntityId, SourceState)],
        events: &[StateEvent],
    ) -> Vec<PublishedRow> {
        let mut rows = Vec::with_capacity(events.len() + 1);
        let state = self.sensor.initial_update(snapshot);
        rows.push(PublishedRow {
            seq: 0,
            entity_id: EntityId::new(),
            value: state.value,
            available: state.available,
            applied: true,
        });
        for (i, event) in events.iter().enumerate() {
            rows.push(self.step(i + 1, event));
        }
        debug!(sensor = self.sensor.name(), steps = rows.len(), "replay finished");
        rows
    }

    /// Applies a single event.
    pub fn step(&mut self, seq: usize, event: &StateEvent) -> PublishedRow {
        let applied = self
            .sensor
            .on_state_change(&event.entity_id, &event.state)
            .is_some();
        let state = self.sensor.state();
        PublishedRow {
            seq,
            entity_id: event.entity_id.clone(),
            value: state.value,
            available: state.available,
            applied,
        }
    }

    pub fn sensor(&self) -> &GroupSensor {
        &self.sensor
    }
}
