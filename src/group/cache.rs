use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::state::{EntityId, RawValue, SourceState, UnitOfPower, to_native_unit};

/// Last known value of each source, already converted to the native unit.
///
/// A key is present only while the latest state of that source was a valid
/// reading. Sentinels and conversion failures remove the key; nothing is
/// ever stored as an implicit zero.
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    values: HashMap<EntityId, Decimal>,
    native_unit: UnitOfPower,
}

impl SourceCache {
    /// Creates an empty cache converting readings into `native_unit`.
    pub fn new(native_unit: UnitOfPower) -> Self {
        Self {
            values: HashMap::new(),
            native_unit,
        }
    }

    /// Replaces the whole cache with the given readings.
    ///
    /// Readings that cannot be converted are skipped.
    pub fn load(&mut self, available: &[(EntityId, RawValue)]) {
        self.values.clear();
        for (entity_id, raw) in available {
            if let Some(value) = self.convert(entity_id, raw) {
                self.values.insert(entity_id.clone(), value);
            }
        }
    }

    /// Applies a single state change: sentinels and unconvertible readings
    /// remove the entry, valid readings overwrite it.
    pub fn apply(&mut self, entity_id: &str, state: &SourceState) {
        let value = match state {
            SourceState::Unknown | SourceState::Unavailable => None,
            SourceState::Value(raw) => self.convert(entity_id, raw),
        };
        match value {
            Some(v) => {
                self.values.insert(entity_id.to_string(), v);
            }
            None => {
                self.values.remove(entity_id);
            }
        }
    }

    fn convert(&self, entity_id: &str, raw: &RawValue) -> Option<Decimal> {
        match to_native_unit(raw, self.native_unit) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(entity_id, error = %e, "treating source as absent");
                None
            }
        }
    }

    pub fn get(&self, entity_id: &str) -> Option<Decimal> {
        self.values.get(entity_id).copied()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.values.contains_key(entity_id)
    }

    /// Iterates over all cached values in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.values.values().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
