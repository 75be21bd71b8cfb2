//! TOML-based group configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Top-level configuration parsed from TOML.
///
/// Load from TOML with [`GroupConfig::from_toml_file`] or use
/// [`GroupConfig::from_preset`] for a built-in group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// The grouped sensor itself.
    #[serde(default)]
    pub group: GroupSection,
    /// Synthetic event stream parameters, used when no event log is given.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Aggregation strategy of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Base entity minus the subtracted entities.
    #[default]
    Subtract,
    /// Sum of all member entities.
    Sum,
}

/// Grouped sensor parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupSection {
    /// Display name of the group sensor.
    pub name: String,
    /// Aggregation strategy.
    #[serde(rename = "type")]
    pub kind: GroupType,
    /// Explicit unique id; derived from the members when absent.
    pub unique_id: Option<String>,
    /// Entity id of the group sensor itself, excluded from its members.
    pub entity_id: Option<String>,
    /// Minuend entity (subtract groups).
    pub base_entity: String,
    /// Entities deducted from the base (subtract groups).
    pub subtract_entities: Vec<String>,
    /// Member entities (sum groups).
    pub entities: Vec<String>,
    /// Decimal places of the published value.
    pub precision: u32,
    /// Publish zero / stay available instead of going unavailable.
    pub ignore_unavailable_state: bool,
}

impl Default for GroupSection {
    fn default() -> Self {
        Self {
            name: "Power group".to_string(),
            kind: GroupType::Subtract,
            unique_id: None,
            entity_id: None,
            base_entity: String::new(),
            subtract_entities: Vec::new(),
            entities: Vec::new(),
            precision: 2,
            ignore_unavailable_state: false,
        }
    }
}

/// Synthetic event stream parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Random seed of the generator.
    pub seed: u64,
    /// Number of state-change events to generate after the snapshot.
    pub steps: usize,
    /// Probability that an event reports `unavailable` (0.0-1.0).
    pub unavailable_probability: f64,
    /// Upper bound of the unmetered household baseline (W).
    pub baseline_max_w: u32,
    /// Upper bound of a single appliance draw (W).
    pub appliance_max_w: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 48,
            unavailable_probability: 0.05,
            baseline_max_w: 400,
            appliance_max_w: 3000,
        }
    }
}

/// Maximum supported display precision.
pub const MAX_PRECISION: u32 = 10;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"group.base_entity"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl GroupConfig {
    /// Mains meter minus the large appliances.
    pub fn demo() -> Self {
        Self {
            group: GroupSection {
                name: "House without appliances".to_string(),
                entity_id: Some("sensor.house_without_appliances_power".to_string()),
                base_entity: "sensor.mains_power".to_string(),
                subtract_entities: vec![
                    "sensor.heat_pump_power".to_string(),
                    "sensor.ev_charger_power".to_string(),
                    "sensor.dishwasher_power".to_string(),
                ],
                ..GroupSection::default()
            },
            demo: DemoConfig::default(),
        }
    }

    /// Sum of the large appliances, staying at zero when all are unavailable.
    pub fn demo_sum() -> Self {
        Self {
            group: GroupSection {
                name: "Appliances".to_string(),
                kind: GroupType::Sum,
                entities: vec![
                    "sensor.heat_pump_power".to_string(),
                    "sensor.ev_charger_power".to_string(),
                    "sensor.dishwasher_power".to_string(),
                ],
                ignore_unavailable_state: true,
                ..GroupSection::default()
            },
            demo: DemoConfig {
                unavailable_probability: 0.15,
                ..DemoConfig::default()
            },
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "demo_sum"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "demo_sum" => Ok(Self::demo_sum()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates structural constraints and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is usable.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let g = &self.group;

        if g.name.trim().is_empty() {
            errors.push(ConfigError::new("group.name", "must not be empty"));
        }

        match g.kind {
            GroupType::Subtract => {
                if g.base_entity.trim().is_empty() {
                    errors.push(ConfigError::new(
                        "group.base_entity",
                        "required for subtract groups",
                    ));
                }
                if g.subtract_entities.contains(&g.base_entity) {
                    errors.push(ConfigError::new(
                        "group.subtract_entities",
                        format!("must not contain the base entity \"{}\"", g.base_entity),
                    ));
                }
                if let Some(dup) = first_duplicate(&g.subtract_entities) {
                    errors.push(ConfigError::new(
                        "group.subtract_entities",
                        format!("\"{dup}\" listed more than once"),
                    ));
                }
                if !g.entities.is_empty() {
                    errors.push(ConfigError::new(
                        "group.entities",
                        "only used by sum groups",
                    ));
                }
            }
            GroupType::Sum => {
                if g.entities.is_empty() {
                    errors.push(ConfigError::new(
                        "group.entities",
                        "sum groups need at least one entity",
                    ));
                }
                if let Some(dup) = first_duplicate(&g.entities) {
                    errors.push(ConfigError::new(
                        "group.entities",
                        format!("\"{dup}\" listed more than once"),
                    ));
                }
                if !g.base_entity.is_empty() || !g.subtract_entities.is_empty() {
                    errors.push(ConfigError::new(
                        "group.base_entity",
                        "only used by subtract groups",
                    ));
                }
            }
        }

        if g.precision > MAX_PRECISION {
            errors.push(ConfigError::new(
                "group.precision",
                format!("must be <= {MAX_PRECISION}"),
            ));
        }

        let d = &self.demo;
        if !(0.0..=1.0).contains(&d.unavailable_probability) {
            errors.push(ConfigError::new(
                "demo.unavailable_probability",
                "must be in [0.0, 1.0]",
            ));
        }
        if d.appliance_max_w == 0 {
            errors.push(ConfigError::new("demo.appliance_max_w", "must be > 0"));
        }

        errors
    }
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    ids.iter().map(String::as_str).find(|id| !seen.insert(*id))
}
