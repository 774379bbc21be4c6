//! Transit search.
//!
//! Responsibilities:
//!
//! - build period/duration grids (`grid`)
//! - evaluate the Box Least Squares periodogram (`bls`)
//! - read the best period/epoch back out of a result (`extract`)

pub mod bls;
pub mod extract;
pub mod grid;

pub use bls::*;
pub use extract::*;
pub use grid::*;

use tracing::info;

use crate::domain::{LightCurve, Objective, SearchRange};
use crate::error::AppError;

/// Run BLS on a flattened light curve.
///
/// Returns `(periodogram, best_period_days, best_epoch_btjd)`.
pub fn run_bls(
    lc_flat: &LightCurve,
    range: &SearchRange,
    objective: Objective,
) -> Result<(BlsPeriodogram, f64, f64), AppError> {
    let grid = build_search_grid(range)?;
    let periodogram = BoxLeastSquares::from_lightcurve(lc_flat)?.power(&grid, objective)?;
    let (period, epoch) = extract_best(&periodogram)?;
    info!(period, epoch, "best BLS peak");
    Ok((periodogram, period, epoch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_bls_on_flat_noise_free_series_is_an_extraction_error() {
        // A perfectly flat series has no dip anywhere, so every power is NaN and
        // extraction must fail instead of inventing a period.
        let time: Vec<f64> = (0..500).map(|i| i as f64 * 0.02).collect();
        let lc = LightCurve::new(time, vec![1.0; 500], None).unwrap();
        let range = SearchRange {
            period_min: 0.5,
            period_max: 2.0,
            duration_min: 0.05,
            duration_max: 0.1,
            grid_size: 20,
        };
        let err = run_bls(&lc, &range, Objective::Snr).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
