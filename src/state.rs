//! Source states as reported by the host and their conversion into the
//! group's native power unit.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ConversionError;

/// Opaque identifier of a tracked source entity (e.g. `sensor.mains_power`).
pub type EntityId = String;

/// Host state string marking a source whose value is not known.
pub const STATE_UNKNOWN: &str = "unknown";
/// Host state string marking a source that is currently unreachable.
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// A reading exactly as the host reported it, before unit conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// Raw state string, expected to hold a number.
    pub state: String,
    /// Unit of measurement attribute, if the source declares one.
    pub unit: Option<String>,
}

impl RawValue {
    /// Creates a raw value without a unit (interpreted as the native unit).
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            unit: None,
        }
    }

    /// Creates a raw value carrying a unit of measurement.
    pub fn with_unit(state: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            unit: Some(unit.into()),
        }
    }
}

/// State of one source at the host boundary: a sentinel or a raw reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    Unknown,
    Unavailable,
    Value(RawValue),
}

impl SourceState {
    /// Classifies a host state string, mapping the two sentinel strings to
    /// their variants. Empty units are dropped.
    pub fn parse(state: &str, unit: Option<&str>) -> Self {
        match state.trim() {
            STATE_UNKNOWN => Self::Unknown,
            STATE_UNAVAILABLE => Self::Unavailable,
            _ => Self::Value(RawValue {
                state: state.to_string(),
                unit: unit
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_string),
            }),
        }
    }

    /// Shorthand for a unit-less reading.
    pub fn value(state: impl Into<String>) -> Self {
        Self::Value(RawValue::new(state))
    }

    /// Returns `true` for `Unknown` and `Unavailable`.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Unknown | Self::Unavailable)
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str(STATE_UNKNOWN),
            Self::Unavailable => f.write_str(STATE_UNAVAILABLE),
            Self::Value(raw) => match &raw.unit {
                Some(unit) => write!(f, "{} {unit}", raw.state),
                None => f.write_str(&raw.state),
            },
        }
    }
}

/// Units of power a source may report in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnitOfPower {
    MilliWatt,
    #[default]
    Watt,
    KiloWatt,
    MegaWatt,
    GigaWatt,
    BtuPerHour,
}

impl UnitOfPower {
    /// Host-facing unit symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::MilliWatt => "mW",
            Self::Watt => "W",
            Self::KiloWatt => "kW",
            Self::MegaWatt => "MW",
            Self::GigaWatt => "GW",
            Self::BtuPerHour => "BTU/h",
        }
    }

    /// Number of watts in one unit.
    fn watts(self) -> Decimal {
        match self {
            Self::MilliWatt => Decimal::new(1, 3),
            Self::Watt => Decimal::ONE,
            Self::KiloWatt => Decimal::from(1_000),
            Self::MegaWatt => Decimal::from(1_000_000),
            Self::GigaWatt => Decimal::from(1_000_000_000_i64),
            Self::BtuPerHour => Decimal::new(29_307_107, 8),
        }
    }

    /// Converts `value` expressed in `self` into `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::OutOfRange`] if the result does not fit a
    /// `Decimal`.
    pub fn convert(self, value: Decimal, to: Self) -> Result<Decimal, ConversionError> {
        if self == to {
            return Ok(value);
        }
        value
            .checked_mul(self.watts())
            .and_then(|w| w.checked_div(to.watts()))
            .ok_or_else(|| ConversionError::OutOfRange(value.to_string()))
    }
}

impl FromStr for UnitOfPower {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mW" => Ok(Self::MilliWatt),
            "W" => Ok(Self::Watt),
            "kW" => Ok(Self::KiloWatt),
            "MW" => Ok(Self::MegaWatt),
            "GW" => Ok(Self::GigaWatt),
            "BTU/h" => Ok(Self::BtuPerHour),
            other => Err(ConversionError::UnsupportedUnit(other.to_string())),
        }
    }
}

impl fmt::Display for UnitOfPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parses a host state string as a decimal, accepting scientific notation.
///
/// Exponents below the `Decimal` resolution round towards zero instead of
/// failing, so `"1e-100"` reads as zero.
///
/// # Errors
///
/// Returns [`ConversionError::InvalidNumber`] for anything that is not a
/// finite number (`nan`, `inf`, empty strings, digit separators, garbage)
/// and [`ConversionError::OutOfRange`] when the exponent pushes the value
/// past the `Decimal` range.
pub fn parse_decimal(state: &str) -> Result<Decimal, ConversionError> {
    let invalid = || ConversionError::InvalidNumber(state.to_string());
    let trimmed = state.trim();
    if trimmed.contains('_') {
        return Err(invalid());
    }
    let (mantissa, exponent) = match trimmed.find(['e', 'E']) {
        Some(pos) => {
            let exponent = trimmed[pos + 1..].parse::<i64>().map_err(|_| invalid())?;
            (&trimmed[..pos], exponent)
        }
        None => (trimmed, 0),
    };
    let mantissa = Decimal::from_str(mantissa).map_err(|_| invalid())?;
    shift_decimal_point(mantissa, exponent)
        .ok_or_else(|| ConversionError::OutOfRange(state.to_string()))
}

/// Multiplies `value` by `10^exponent`, one digit at a time.
fn shift_decimal_point(mut value: Decimal, exponent: i64) -> Option<Decimal> {
    for _ in 0..exponent.unsigned_abs() {
        if value.is_zero() {
            break;
        }
        value = if exponent > 0 {
            value.checked_mul(Decimal::TEN)?
        } else {
            value.checked_div(Decimal::TEN)?
        };
    }
    Some(value)
}

/// Converts a raw reading into `native`. A reading without a unit is taken
/// to already be in the native unit.
///
/// # Errors
///
/// Fails when the state is not numeric, the unit is unsupported, or the
/// converted value overflows.
pub fn to_native_unit(raw: &RawValue, native: UnitOfPower) -> Result<Decimal, ConversionError> {
    let value = parse_decimal(&raw.state)?;
    match raw.unit.as_deref() {
        None => Ok(value),
        Some(unit) => unit.parse::<UnitOfPower>()?.convert(value, native),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("test literal should parse")
    }

    #[test]
    fn parse_maps_sentinels() {
        assert_eq!(SourceState::parse("unknown", None), SourceState::Unknown);
        assert_eq!(
            SourceState::parse("unavailable", Some("W")),
            SourceState::Unavailable
        );
        assert!(SourceState::parse("unavailable", None).is_sentinel());
    }

    #[test]
    fn parse_keeps_value_and_drops_empty_unit() {
        assert_eq!(
            SourceState::parse("12.5", Some("")),
            SourceState::Value(RawValue::new("12.5"))
        );
        assert_eq!(
            SourceState::parse("1.2", Some("kW")),
            SourceState::Value(RawValue::with_unit("1.2", "kW"))
        );
    }

    #[test]
    fn unitless_value_is_native() {
        let v = to_native_unit(&RawValue::new(" 42.10 "), UnitOfPower::Watt);
        assert_eq!(v, Ok(dec("42.1")));
    }

    #[test]
    fn kilowatts_convert_exactly_to_watts() {
        let v = to_native_unit(&RawValue::with_unit("1.234", "kW"), UnitOfPower::Watt);
        assert_eq!(v, Ok(dec("1234")));
    }

    #[test]
    fn milliwatts_and_megawatts_convert() {
        let mw = to_native_unit(&RawValue::with_unit("500", "mW"), UnitOfPower::Watt);
        assert_eq!(mw, Ok(dec("0.5")));
        let big = to_native_unit(&RawValue::with_unit("0.002", "MW"), UnitOfPower::Watt);
        assert_eq!(big, Ok(dec("2000")));
    }

    #[test]
    fn watts_convert_down_to_kilowatts() {
        let v = UnitOfPower::Watt.convert(dec("250"), UnitOfPower::KiloWatt);
        assert_eq!(v, Ok(dec("0.25")));
    }

    #[test]
    fn scientific_notation_is_accepted() {
        assert_eq!(parse_decimal("1.2e3"), Ok(dec("1200")));
    }

    #[test]
    fn tiny_exponents_round_to_zero() {
        assert_eq!(parse_decimal("1e-100"), Ok(Decimal::ZERO));
        assert_eq!(parse_decimal("-2.5E-40"), Ok(Decimal::ZERO));
        assert_eq!(parse_decimal("15e-4"), Ok(dec("0.0015")));
    }

    #[test]
    fn huge_exponents_are_out_of_range() {
        assert_eq!(
            parse_decimal("1e400"),
            Err(ConversionError::OutOfRange("1e400".to_string()))
        );
        assert_eq!(parse_decimal("0e400"), Ok(Decimal::ZERO));
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "nan", "inf", "on", "1_000", "e5", "1e", "1e2.5"] {
            assert_eq!(
                parse_decimal(bad),
                Err(ConversionError::InvalidNumber(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn unsupported_unit_is_rejected() {
        let v = to_native_unit(&RawValue::with_unit("3", "kWh"), UnitOfPower::Watt);
        assert_eq!(v, Err(ConversionError::UnsupportedUnit("kWh".to_string())));
    }

    #[test]
    fn unit_symbols_round_trip() {
        for unit in [
            UnitOfPower::MilliWatt,
            UnitOfPower::Watt,
            UnitOfPower::KiloWatt,
            UnitOfPower::MegaWatt,
            UnitOfPower::GigaWatt,
            UnitOfPower::BtuPerHour,
        ] {
            assert_eq!(unit.symbol().parse::<UnitOfPower>(), Ok(unit));
        }
    }
}
