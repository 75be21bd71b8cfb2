//! CSV export of replay results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::replay::PublishedRow;

/// Column header for CSV export.
pub const HEADER: &str = "seq,entity_id,value_w,available";

/// Exports published rows to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(rows: &[PublishedRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(rows, buf)
}

/// Writes published rows as CSV to any writer.
///
/// Values are written as published (already rounded); the value column is
/// empty while the sensor has never been known.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(rows: &[PublishedRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for r in rows {
        wtr.write_record(&[
            r.seq.to_string(),
            r.entity_id.clone(),
            r.value.map(|v| v.to_string()).unwrap_or_default(),
            r.available.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn make_row(seq: usize) -> PublishedRow {
        PublishedRow {
            seq,
            entity_id: "sensor.mains_power".to_string(),
            value: Some(Decimal::new(12345, 2)),
            available: true,
            applied: true,
        }
    }

    #[test]
    fn header_and_row_count() {
        let rows: Vec<PublishedRow> = (0..5).map(make_row).collect();
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.first().copied(), Some(HEADER));
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "0,sensor.mains_power,123.45,true");
    }

    #[test]
    fn unknown_value_is_empty_column() {
        let mut row = make_row(0);
        row.value = None;
        row.available = false;
        let mut buf = Vec::new();
        write_csv(&[row], &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        assert_eq!(output.lines().nth(1), Some("0,sensor.mains_power,,false"));
    }

    #[test]
    fn output_is_readable_back() {
        let rows: Vec<PublishedRow> = (0..3).map(make_row).collect();
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(4));
        let parsed: Vec<csv::StringRecord> = rdr.records().filter_map(|r| r.ok()).collect();
        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(|r| r[2].parse::<Decimal>().is_ok()));
    }

    #[test]
    fn exported_values_carry_sensor_precision() {
        use crate::group::SubtractAggregator;
        use crate::replay::{Replay, StateEvent};
        use crate::sensor::GroupSensor;
        use crate::state::SourceState;

        let sensor = GroupSensor::new(
            "Net",
            "net",
            Box::new(SubtractAggregator::new("base", vec!["a".to_string()])),
        );
        let rows = Replay::new(sensor).run(
            &[("base".to_string(), SourceState::value("100"))],
            &[StateEvent::new("a", SourceState::value("12.5"))],
        );
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "0,,100.00,true");
        assert_eq!(lines[2], "1,a,87.50,true");
    }
}
