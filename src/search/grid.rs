//! Period and duration grids for the BLS search.
//!
//! Both grids are linear. The duration grid is capped at 90% of the shortest
//! trial period: a box longer than the orbit it repeats on is meaningless, and
//! the search kernel assumes every duration is shorter than every period.

use tracing::{debug, warn};

use crate::domain::{DURATION_STEPS, SearchRange};
use crate::error::AppError;
use crate::math::linspace;

/// Fraction of the minimum period used as the duration ceiling.
pub const DURATION_CEILING_FRACTION: f64 = 0.9;

/// Fraction of the minimum period used when the clamp leaves no valid duration.
pub const DEGENERATE_DURATION_FRACTION: f64 = 0.45;

/// Grids handed to the periodogram engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGrid {
    pub periods: Vec<f64>,
    pub durations: Vec<f64>,
}

impl SearchGrid {
    pub fn period_min(&self) -> f64 {
        self.periods.first().copied().unwrap_or(f64::NAN)
    }

    pub fn duration_max(&self) -> f64 {
        self.durations.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// True when every duration is strictly shorter than every period.
    pub fn durations_fit_periods(&self) -> bool {
        !self.periods.is_empty()
            && !self.durations.is_empty()
            && self.duration_max() < self.period_min()
    }
}

/// `grid_size` evenly spaced periods from `period_min` to `period_max` inclusive.
pub fn period_grid(period_min: f64, period_max: f64, grid_size: usize) -> Vec<f64> {
    linspace(period_min, period_max, grid_size)
}

/// Durations from `duration_min` up to `min(duration_max, 0.9 * period_min)`.
///
/// When the clamp collapses the range the grid becomes a single value:
/// `duration_min` if it still fits under the ceiling, else `0.45 * period_min`.
pub fn duration_grid(duration_min: f64, duration_max: f64, period_min: f64) -> Vec<f64> {
    let ceiling = DURATION_CEILING_FRACTION * period_min;
    let upper = duration_max.min(ceiling);

    if upper > duration_min {
        return linspace(duration_min, upper, DURATION_STEPS);
    }

    let single = if duration_min < ceiling {
        duration_min
    } else {
        DEGENERATE_DURATION_FRACTION * period_min
    };
    warn!(
        duration_min,
        duration_max,
        period_min,
        single,
        "duration range collapsed after clamping; searching a single duration"
    );
    vec![single]
}

/// Validate a search range and build both grids.
pub fn build_search_grid(range: &SearchRange) -> Result<SearchGrid, AppError> {
    validate_range(range)?;

    let periods = period_grid(range.period_min, range.period_max, range.grid_size);
    if !periods.windows(2).all(|w| w[1] > w[0]) {
        return Err(AppError::usage(format!(
            "Period range [{}, {}] is too narrow for {} distinct periods.",
            range.period_min, range.period_max, range.grid_size
        )));
    }
    let durations = duration_grid(range.duration_min, range.duration_max, range.period_min);

    debug!(
        n_periods = periods.len(),
        n_durations = durations.len(),
        duration_max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "built BLS grid"
    );

    Ok(SearchGrid { periods, durations })
}

fn validate_range(range: &SearchRange) -> Result<(), AppError> {
    let SearchRange {
        period_min,
        period_max,
        duration_min,
        duration_max,
        grid_size,
    } = *range;

    let all_finite = [period_min, period_max, duration_min, duration_max]
        .iter()
        .all(|v| v.is_finite());
    if !all_finite {
        return Err(AppError::usage("Period and duration limits must be finite."));
    }
    if !(period_min > 0.0 && period_max > period_min) {
        return Err(AppError::usage(format!(
            "Invalid period range: min={period_min}, max={period_max} (must be >0 and max>min)."
        )));
    }
    if !(duration_min > 0.0 && duration_max > 0.0) {
        return Err(AppError::usage(format!(
            "Invalid duration range: min={duration_min}, max={duration_max} (both must be >0)."
        )));
    }
    if grid_size < 2 {
        return Err(AppError::usage("Period grid size must be >= 2."));
    }
    Ok(())
}
