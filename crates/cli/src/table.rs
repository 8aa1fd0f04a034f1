//! CSV input and output using the configured column names

use std::io::{Read, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use modeler_core::{ColumnConfig, ForecastRow, Observation};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Observations from a CSV table with a header row
pub fn read_observations<R: Read>(reader: R, columns: &ColumnConfig) -> Result<Vec<Observation>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().context("Failed to read headers")?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))
    };
    let key_idx = position(&columns.key_col)?;
    let date_idx = position(&columns.date_col)?;
    let value_idx = position(&columns.metric_col)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read record {}", line + 1))?;
        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

        let date = NaiveDate::parse_from_str(field(date_idx), DATE_FORMAT)
            .with_context(|| format!("Record {}: invalid date '{}'", line + 1, field(date_idx)))?;
        let value: f64 = field(value_idx)
            .parse()
            .with_context(|| format!("Record {}: invalid value '{}'", line + 1, field(value_idx)))?;
        rows.push(Observation::new(field(key_idx), date, value));
    }

    if rows.is_empty() {
        bail!("No data rows found");
    }
    Ok(rows)
}

/// Write forecast rows under the configured output column names
pub fn write_forecast<W: Write>(writer: W, rows: &[ForecastRow], columns: &ColumnConfig) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        columns.key_col.as_str(),
        columns.date_col.as_str(),
        columns.fcst_col.as_str(),
        columns.dt_reference_col.as_str(),
        columns.dt_creation_col.as_str(),
    ])?;
    for row in rows {
        writer.write_record([
            row.key.clone(),
            row.date.format(DATE_FORMAT).to_string(),
            row.forecast.to_string(),
            row.reference_date.format(DATE_FORMAT).to_string(),
            row.creation_date.format(DATE_FORMAT).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
