//! CSV light curve ingest.
//!
//! Turns a `time,flux[,flux_err]` CSV into a `LightCurve`.
//!
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - headers are matched case-insensitively after trimming

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{LightCurve, LightCurveMeta};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the light curve plus row-level bookkeeping.
#[derive(Debug, Clone)]
pub struct LoadedLightCurve {
    pub lc: LightCurve,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read a light curve CSV.
pub fn csv_to_lightcurve(path: &Path) -> Result<LoadedLightCurve, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in ["time", "flux"] {
        if !header_map.contains_key(required) {
            return Err(AppError::usage(format!("Missing required column: `{required}`")));
        }
    }
    let has_err = header_map.contains_key("flux_err");

    let mut time = Vec::new();
    let mut flux = Vec::new();
    let mut flux_err = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, has_err) {
            Ok((t, f, e)) => {
                time.push(t);
                flux.push(f);
                flux_err.push(e);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if time.is_empty() {
        return Err(AppError::no_data(format!(
            "No valid rows in '{}' ({} read, {} rejected).",
            path.display(),
            rows_read,
            row_errors.len()
        )));
    }
    if !row_errors.is_empty() {
        warn!(
            path = %path.display(),
            rejected = row_errors.len(),
            first_line = row_errors[0].line,
            "skipped invalid CSV rows"
        );
    }
    info!(path = %path.display(), rows = time.len(), "loaded light curve CSV");

    let meta = LightCurveMeta {
        target: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        ..LightCurveMeta::default()
    };
    let lc = LightCurve::new(time, flux, Some(flux_err))?.with_meta(meta);
    Ok(LoadedLightCurve {
        lc,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    has_err: bool,
) -> Result<(f64, f64, f64), String> {
    let time = parse_required(record, header_map, "time")?;
    let flux = parse_required(record, header_map, "flux")?;
    let flux_err = if has_err {
        get_optional(record, header_map, "flux_err")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    } else {
        f64::NAN
    };
    Ok((time, flux, flux_err))
}

fn parse_required(record: &StringRecord, header_map: &HashMap<String, usize>, key: &str) -> Result<f64, String> {
    let raw = get_optional(record, header_map, key).ok_or_else(|| format!("Missing `{key}` value."))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid `{key}` value '{raw}'."))?;
    if !value.is_finite() {
        return Err(format!("Non-finite `{key}` value."));
    }
    Ok(value)
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, key: &str) -> Option<&'a str> {
    let idx = *header_map.get(key)?;
    let s = record.get(idx)?;
    if s.is_empty() { None } else { Some(s) }
}
