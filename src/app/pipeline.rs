//! Shared search pipeline used by both CLI and TUI front-ends.
//!
//! source -> outlier clip -> flatten -> BLS -> best-peak extraction
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::info;

use crate::data::LightCurveSource;
use crate::domain::{BestFit, LightCurve, SearchConfig};
use crate::error::AppError;
use crate::preprocess::{flatten_lightcurve, remove_outliers};
use crate::report::RunContext;
use crate::search::{BlsPeriodogram, run_bls};

/// All computed outputs of a single `slc bls` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source: String,
    pub sectors: Vec<u32>,
    /// Normalized light curve as loaded.
    pub raw: LightCurve,
    /// Clipped and detrended light curve the search ran on.
    pub flat: LightCurve,
    pub periodogram: BlsPeriodogram,
    pub best: BestFit,
}

impl RunOutput {
    pub fn context(&self, config: &SearchConfig) -> RunContext {
        RunContext {
            source: self.source.clone(),
            target: self.raw.meta.target.clone(),
            sectors: self.sectors.clone(),
            n_raw: self.raw.len(),
            n_clean: self.flat.len(),
            range: config.range,
            durations: self.periodogram.durations.clone(),
            objective: config.objective,
        }
    }
}

/// Load from `source` and run the full search.
pub fn run_search(source: &dyn LightCurveSource, config: &SearchConfig) -> Result<RunOutput, AppError> {
    let description = source.describe();
    info!(source = %description, "loading light curve");
    let (raw, sectors) = source.load()?;
    search_lightcurve(description, raw, sectors, config)
}

/// Run the search on an already loaded light curve.
pub fn search_lightcurve(
    source: String,
    raw: LightCurve,
    sectors: Vec<u32>,
    config: &SearchConfig,
) -> Result<RunOutput, AppError> {
    if raw.is_empty() {
        return Err(AppError::no_data("Light curve has no usable points."));
    }

    let clipped = remove_outliers(&raw, config.sigma);
    let flat = flatten_lightcurve(&clipped, config.window_length)?;
    if flat.is_empty() {
        return Err(AppError::no_data("No points left after cleaning."));
    }
    info!(n_raw = raw.len(), n_clean = flat.len(), "cleaned light curve");

    let (periodogram, period, epoch) = run_bls(&flat, &config.range, config.objective)?;
    let best = best_fit(&periodogram, period, epoch)?;

    Ok(RunOutput {
        source,
        sectors,
        raw,
        flat,
        periodogram,
        best,
    })
}

/// Peak statistics, with period and epoch taken from extraction.
fn best_fit(periodogram: &BlsPeriodogram, period: f64, epoch: f64) -> Result<BestFit, AppError> {
    let best = periodogram
        .peak_index()
        .and_then(|i| periodogram.best_at(i))
        .ok_or_else(|| AppError::runtime("Periodogram has no finite power."))?;
    Ok(BestFit {
        period_days: period,
        epoch_btjd: epoch,
        ..best
    })
}
