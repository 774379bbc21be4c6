//! Tabular exports: light curves, periodograms and model curves.
//!
//! All files are plain CSV with a header row, meant to be easy to consume in
//! spreadsheets or downstream scripts.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::LightCurve;
use crate::error::AppError;
use crate::search::BlsPeriodogram;

#[derive(Serialize)]
struct LightCurveRow {
    time: f64,
    flux: f64,
    flux_err: f64,
}

#[derive(Serialize)]
struct PeriodogramRow {
    period: f64,
    power: f64,
    duration: f64,
    transit_time: f64,
    depth: f64,
    depth_err: f64,
    depth_snr: f64,
    log_likelihood: f64,
}

#[derive(Serialize)]
struct ModelRow {
    time: f64,
    model_flux: f64,
}

/// Write `time,flux,flux_err`; returns the path written.
pub fn lc_to_csv(lc: &LightCurve, path: &Path) -> Result<PathBuf, AppError> {
    let rows = (0..lc.len()).map(|i| LightCurveRow {
        time: lc.time[i],
        flux: lc.flux[i],
        flux_err: lc.flux_err[i],
    });
    write_rows(path, "light curve", rows)?;
    Ok(path.to_path_buf())
}

/// One row per trial period.
pub fn write_periodogram_csv(path: &Path, periodogram: &BlsPeriodogram) -> Result<(), AppError> {
    let rows = (0..periodogram.period.len()).map(|i| PeriodogramRow {
        period: periodogram.period[i],
        power: periodogram.power[i],
        duration: periodogram.duration[i],
        transit_time: periodogram.transit_time[i],
        depth: periodogram.depth[i],
        depth_err: periodogram.depth_err[i],
        depth_snr: periodogram.depth_snr[i],
        log_likelihood: periodogram.log_likelihood[i],
    });
    write_rows(path, "periodogram", rows)
}

/// `time,model_flux` pairs.
pub fn write_model_csv(path: &Path, time: &[f64], model_flux: &[f64]) -> Result<(), AppError> {
    if time.len() != model_flux.len() {
        return Err(AppError::runtime(format!(
            "Model length {} does not match time length {}.",
            model_flux.len(),
            time.len()
        )));
    }
    let rows = time
        .iter()
        .zip(model_flux)
        .map(|(&time, &model_flux)| ModelRow { time, model_flux });
    write_rows(path, "model", rows)
}

fn write_rows<R: Serialize>(path: &Path, what: &str, rows: impl Iterator<Item = R>) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create {what} CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::runtime(format!("Failed to write {what} CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush {what} CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_to_lightcurve;

    #[test]
    fn light_curve_csv_reads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lc.csv");
        let lc = LightCurve::new(vec![1.5, 2.5], vec![0.998, 1.002], Some(vec![0.001, 0.001])).unwrap();
        let written = lc_to_csv(&lc, &path).unwrap();
        assert_eq!(written, path);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("time,flux,flux_err\n"));
        let back = csv_to_lightcurve(&path).unwrap().lc;
        assert_eq!(back.time, lc.time);
        assert_eq!(back.flux, lc.flux);
    }

    #[test]
    fn model_csv_rejects_length_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("model.csv");
        assert!(write_model_csv(&path, &[1.0, 2.0], &[1.0]).is_err());
        write_model_csv(&path, &[1.0, 2.0], &[0.99, 1.0]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("time,model_flux"));
        assert_eq!(text.lines().count(), 3);
    }
}
