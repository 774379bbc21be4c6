//! Read/write BLS summary JSON files.
//!
//! The summary is the portable record of a search: where the data came from,
//! the grid that was searched and the best peak. The schema is defined by
//! `domain::SummaryFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{BestFit, LightCurve, Objective, SearchRange, SummaryFile};
use crate::error::AppError;

/// Assemble a summary for a finished run.
pub fn build_summary(
    lc: &LightCurve,
    sectors: &[u32],
    objective: Objective,
    range: &SearchRange,
    duration_grid: &[f64],
    best: BestFit,
) -> SummaryFile {
    SummaryFile {
        tool: "slc".to_string(),
        generated: Utc::now(),
        target: lc.meta.target.clone(),
        sectors: sectors.to_vec(),
        n_points: lc.len(),
        objective,
        range: *range,
        duration_grid: duration_grid.to_vec(),
        best,
    }
}

pub fn write_summary_json(path: &Path, summary: &SummaryFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::runtime(format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

pub fn read_summary_json(path: &Path) -> Result<SummaryFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: SummaryFile =
        serde_json::from_reader(file).map_err(|e| AppError::usage(format!("Invalid summary JSON: {e}")))?;
    Ok(summary)
}
