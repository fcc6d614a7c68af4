//! Best-effort ingestion of raw concentration-time CSV files
//!
//! The source datasets are hand-digitized spreadsheets rather than a strict
//! format, so header matching is flexible and numeric parsing accepts comma
//! decimal separators. Infusion durations are not a column of their own but
//! are inferred from the free-text condition label.

use crate::data::{Data, Observation};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Errors encountered when reading a datafile
#[derive(Error, Debug)]
pub enum DataError {
    /// Error encountered when reading CSV data
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// A required numeric cell could not be parsed
    #[error("invalid numeric value {value:?} in column {column} (record {record})")]
    InvalidNumber {
        value: String,
        column: &'static str,
        record: usize,
    },
}

/// Read a raw CSV datafile into a [Data] object
///
/// Recognized columns, matched case-insensitively:
/// - subject identifier: `ID` or `participant_id`
/// - observation time (hours): `TIME`
/// - concentration: `CONC` or `Avg`
/// - dose (mg): `Dose`
/// - condition label: `Condition`
///
/// Missing cells and missing columns default to `0.0` (or an empty string);
/// present but malformed numeric cells are an error.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Data, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| -> Option<usize> {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
    };
    let id_col = column(&["ID", "participant_id"]);
    let time_col = column(&["TIME"]);
    let conc_col = column(&["CONC", "Avg"]);
    let dose_col = column(&["Dose"]);
    let condition_col = column(&["Condition"]);

    let mut observations = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |col: Option<usize>| col.and_then(|i| record.get(i)).unwrap_or("");
        let number = |col: Option<usize>, name: &'static str| -> Result<f64, DataError> {
            let raw = cell(col);
            if raw.trim().is_empty() {
                return Ok(0.0);
            }
            parse_decimal(raw).ok_or_else(|| DataError::InvalidNumber {
                value: raw.to_string(),
                column: name,
                record: index + 1,
            })
        };

        let condition = cell(condition_col).to_string();
        observations.push(Observation {
            subject_id: cell(id_col).trim().to_string(),
            time: number(time_col, "TIME")?,
            conc: number(conc_col, "CONC")?,
            dose: number(dose_col, "Dose")?,
            infusion_duration: infusion_duration_from_condition(&condition),
            condition,
        });
    }

    tracing::debug!("Read {} observations", observations.len());
    Ok(Data::new(observations))
}

/// Parse a float, accepting comma decimal separators
pub fn parse_decimal(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse::<f64>().ok()
}

/// Infer the infusion duration (hours) from a free-text condition label
///
/// Labels without the word "infusion" are bolus conditions. Otherwise the
/// leading number of an "<n> h infusion" or "<n> hour infusion" token is
/// used, falling back to the number preceding the first "h". Anything
/// unparseable yields `0.0`.
pub fn infusion_duration_from_condition(condition: &str) -> f64 {
    let text = condition.to_lowercase();
    if !text.contains("infusion") {
        return 0.0;
    }
    let cleaned = text.replace(['(', ')'], " ");
    for token in cleaned.split(',') {
        let token = token.trim();
        if token.contains("h infusion") || token.contains("hour infusion") {
            if let Some(value) = token.split(' ').next().and_then(parse_decimal) {
                return value;
            }
        }
    }
    if let Some(idx) = text.find('h') {
        if idx > 0 {
            if let Some(value) = text[..idx].split_whitespace().last().and_then(parse_decimal) {
                return value;
            }
        }
    }
    0.0
}

/// Load a metadata JSON file, best-effort
///
/// A missing file or malformed JSON yields an empty map; the report simply
/// omits the metadata-derived lines.
pub fn read_metadata(path: impl AsRef<Path>) -> Map<String, Value> {
    let Ok(content) = std::fs::read_to_string(path.as_ref()) else {
        return Map::new();
    };
    serde_json::from_str::<Value>(&content)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}
