//! Post-hoc summary of a replay.

use std::fmt;

use rust_decimal::Decimal;

use crate::replay::PublishedRow;

/// Summary statistics derived from the published rows of a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Number of events applied after the snapshot (ignored events excluded).
    pub updates: usize,
    /// Rows in which the sensor was unavailable.
    pub unavailable_rows: usize,
    /// Events for non-members that the sensor ignored.
    pub ignored_events: usize,
    /// Smallest value published while available.
    pub min: Option<Decimal>,
    /// Largest value published while available.
    pub max: Option<Decimal>,
    /// Value published by the final row, if it was available.
    pub last: Option<Decimal>,
}

impl Report {
    /// Computes the summary from the complete row vector.
    pub fn from_rows(rows: &[PublishedRow]) -> Self {
        let mut report = Self::default();
        for r in rows {
            if r.seq > 0 {
                if r.applied {
                    report.updates += 1;
                } else {
                    report.ignored_events += 1;
                }
            }
            if !r.available {
                report.unavailable_rows += 1;
                continue;
            }
            if let Some(v) = r.value {
                report.min = Some(report.min.map_or(v, |m| m.min(v)));
                report.max = Some(report.max.map_or(v, |m| m.max(v)));
            }
        }
        report.last = rows
            .last()
            .filter(|r| r.available)
            .and_then(|r| r.value);
        report
    }
}

fn fmt_watts(v: Option<Decimal>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v} W"))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Group Report ---")?;
        writeln!(f, "Updates applied:       {}", self.updates)?;
        writeln!(f, "Ignored events:        {}", self.ignored_events)?;
        writeln!(f, "Unavailable rows:      {}", self.unavailable_rows)?;
        writeln!(f, "Minimum:               {}", fmt_watts(self.min))?;
        writeln!(f, "Maximum:               {}", fmt_watts(self.max))?;
        write!(f, "Last:                  {}", fmt_watts(self.last))
    }
}
