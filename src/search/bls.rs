//! Box Least Squares periodogram.
//!
//! For each trial period the light curve is folded and binned at
//! `min(duration) / oversample`. The first `oversample` bins are copied past the
//! end so boxes may straddle phase zero, and cumulative sums give the weighted
//! in-transit and out-of-transit means of every (duration, start bin) window in
//! O(1). For a window:
//!
//! ```text
//! depth          = mean_out - mean_in
//! depth_err      = sqrt(1/ivar_in + 1/ivar_out)
//! snr            = depth / depth_err
//! log_likelihood = 0.5 * depth^2 / (1/ivar_in + 1/ivar_out)
//! ```
//!
//! Only dips (`depth > 0`) are considered. The power of a period is the best
//! objective over all windows; periods with no admissible window get NaN.
//! Periods are independent, so they are evaluated in parallel.

use rayon::prelude::*;
use tracing::{debug, info};
use uom::si::f64::Time;
use uom::si::time::day;

use crate::domain::{BestFit, LightCurve, Objective};
use crate::error::AppError;
use crate::math::nanargmax;
use crate::search::extract::{PeriodValue, PeriodogramResult, TessTime, TransitEpoch};
use crate::search::grid::SearchGrid;

/// Phase bins per minimum duration.
pub const DEFAULT_OVERSAMPLE: usize = 10;

/// Minimum inverse variance for a window side to count as populated.
const IVAR_EPS: f64 = 1e-12;

/// A light curve prepared for BLS: finite rows, mean-subtracted flux, weights.
#[derive(Debug, Clone)]
pub struct BoxLeastSquares {
    time: Vec<f64>,
    y: Vec<f64>,
    ivar: Vec<f64>,
    oversample: usize,
}

/// Best window for one trial period.
#[derive(Debug, Clone, Copy)]
struct PeriodStats {
    power: f64,
    duration: f64,
    transit_time: f64,
    depth: f64,
    depth_err: f64,
    depth_snr: f64,
    log_likelihood: f64,
}

impl PeriodStats {
    fn empty() -> Self {
        Self {
            power: f64::NAN,
            duration: f64::NAN,
            transit_time: f64::NAN,
            depth: f64::NAN,
            depth_err: f64::NAN,
            depth_snr: f64::NAN,
            log_likelihood: f64::NAN,
        }
    }
}

/// Periodogram output: one entry per trial period.
#[derive(Debug, Clone, PartialEq)]
pub struct BlsPeriodogram {
    pub objective: Objective,
    pub period: Vec<f64>,
    pub power: Vec<f64>,
    pub duration: Vec<f64>,
    pub transit_time: Vec<f64>,
    pub depth: Vec<f64>,
    pub depth_err: Vec<f64>,
    pub depth_snr: Vec<f64>,
    pub log_likelihood: Vec<f64>,
    /// Durations that were searched.
    pub durations: Vec<f64>,
}

impl BoxLeastSquares {
    /// Prepare a (flattened) light curve for searching.
    ///
    /// Rows with non-finite time or flux are ignored. Flux uncertainties are
    /// used as weights only when every remaining row has a positive finite one.
    pub fn from_lightcurve(lc: &LightCurve) -> Result<Self, AppError> {
        let rows: Vec<usize> = (0..lc.len())
            .filter(|&i| lc.time[i].is_finite() && lc.flux[i].is_finite())
            .collect();
        if rows.len() < 3 {
            return Err(AppError::no_data(format!(
                "BLS needs at least 3 finite samples (got {}).",
                rows.len()
            )));
        }

        let use_errors = rows
            .iter()
            .all(|&i| lc.flux_err[i].is_finite() && lc.flux_err[i] > 0.0);
        let ivar: Vec<f64> = rows
            .iter()
            .map(|&i| {
                if use_errors {
                    1.0 / (lc.flux_err[i] * lc.flux_err[i])
                } else {
                    1.0
                }
            })
            .collect();

        let sum_ivar: f64 = ivar.iter().sum();
        let mean = rows
            .iter()
            .zip(ivar.iter())
            .map(|(&i, w)| lc.flux[i] * w)
            .sum::<f64>()
            / sum_ivar;

        Ok(Self {
            time: rows.iter().map(|&i| lc.time[i]).collect(),
            y: rows.iter().map(|&i| lc.flux[i] - mean).collect(),
            ivar,
            oversample: DEFAULT_OVERSAMPLE,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.time.len()
    }

    /// Evaluate the periodogram over `grid`.
    pub fn power(&self, grid: &SearchGrid, objective: Objective) -> Result<BlsPeriodogram, AppError> {
        if grid.periods.is_empty() || grid.durations.is_empty() {
            return Err(AppError::usage("BLS grid must contain at least one period and one duration."));
        }
        if grid.periods.iter().chain(grid.durations.iter()).any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(AppError::usage("BLS grid values must be positive and finite."));
        }
        if !grid.durations_fit_periods() {
            return Err(AppError::usage(
                "Every BLS duration must be shorter than the shortest trial period.",
            ));
        }

        let d_min = grid.durations.iter().copied().fold(f64::INFINITY, f64::min);
        let bin_duration = d_min / self.oversample as f64;
        let t_ref = self.time.iter().copied().fold(f64::INFINITY, f64::min);
        let sum_y: f64 = self.y.iter().zip(self.ivar.iter()).map(|(y, w)| y * w).sum();
        let sum_ivar: f64 = self.ivar.iter().sum();

        info!(
            n_samples = self.n_samples(),
            n_periods = grid.periods.len(),
            n_durations = grid.durations.len(),
            ?objective,
            "running BLS"
        );

        let stats: Vec<PeriodStats> = grid
            .periods
            .par_iter()
            .map(|&period| {
                self.search_period(
                    period,
                    &grid.durations,
                    bin_duration,
                    t_ref,
                    sum_y,
                    sum_ivar,
                    objective,
                )
            })
            .collect();

        let out = BlsPeriodogram {
            objective,
            period: grid.periods.clone(),
            power: stats.iter().map(|s| s.power).collect(),
            duration: stats.iter().map(|s| s.duration).collect(),
            transit_time: stats.iter().map(|s| s.transit_time).collect(),
            depth: stats.iter().map(|s| s.depth).collect(),
            depth_err: stats.iter().map(|s| s.depth_err).collect(),
            depth_snr: stats.iter().map(|s| s.depth_snr).collect(),
            log_likelihood: stats.iter().map(|s| s.log_likelihood).collect(),
            durations: grid.durations.clone(),
        };

        debug!(
            n_valid = out.power.iter().filter(|p| p.is_finite()).count(),
            "BLS finished"
        );
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn search_period(
        &self,
        period: f64,
        durations: &[f64],
        bin_duration: f64,
        t_ref: f64,
        sum_y: f64,
        sum_ivar: f64,
        objective: Objective,
    ) -> PeriodStats {
        let oversample = self.oversample;
        let n_phase_bins = (period / bin_duration).ceil() as usize;
        let n_bins = n_phase_bins + oversample;

        // Index 0 is the zero of the cumulative sums; data lands in 1..=n_phase_bins.
        let mut cum_y = vec![0.0; n_bins + 1];
        let mut cum_ivar = vec![0.0; n_bins + 1];
        for ((&t, &y), &w) in self.time.iter().zip(self.y.iter()).zip(self.ivar.iter()) {
            let phase = (t - t_ref).rem_euclid(period);
            let ind = ((phase / bin_duration) as usize + 1).min(n_phase_bins);
            cum_y[ind] += y * w;
            cum_ivar[ind] += w;
        }
        for k in 1..=oversample.min(n_phase_bins) {
            cum_y[n_phase_bins + k] = cum_y[k];
            cum_ivar[n_phase_bins + k] = cum_ivar[k];
        }
        for k in 1..=n_bins {
            cum_y[k] += cum_y[k - 1];
            cum_ivar[k] += cum_ivar[k - 1];
        }

        let mut best = PeriodStats::empty();
        for &duration in durations {
            let dur_bins = ((duration / bin_duration).round() as usize).max(1);
            if dur_bins > n_bins {
                continue;
            }
            for n in 0..=(n_bins - dur_bins) {
                let k = n + dur_bins;
                let y_in = cum_y[k] - cum_y[n];
                let ivar_in = cum_ivar[k] - cum_ivar[n];
                let y_out = sum_y - y_in;
                let ivar_out = sum_ivar - ivar_in;
                if ivar_in < IVAR_EPS || ivar_out < IVAR_EPS {
                    continue;
                }

                let mean_in = y_in / ivar_in;
                let mean_out = y_out / ivar_out;
                let depth = mean_out - mean_in;
                if depth <= 0.0 {
                    continue;
                }

                let variance = 1.0 / ivar_in + 1.0 / ivar_out;
                let depth_err = variance.sqrt();
                let depth_snr = depth / depth_err;
                let log_likelihood = 0.5 * depth * depth / variance;
                let power = match objective {
                    Objective::Snr => depth_snr,
                    Objective::LogLikelihood => log_likelihood,
                };

                if best.power.is_finite() && power <= best.power {
                    continue;
                }

                let mid_phase = (n as f64 + 0.5 * dur_bins as f64) * bin_duration;
                best = PeriodStats {
                    power,
                    duration,
                    transit_time: t_ref + mid_phase.rem_euclid(period),
                    depth,
                    depth_err,
                    depth_snr,
                    log_likelihood,
                };
            }
        }
        best
    }
}

impl BlsPeriodogram {
    /// Index of the highest finite power.
    pub fn peak_index(&self) -> Option<usize> {
        nanargmax(&self.power)
    }

    pub fn max_power(&self) -> Option<f64> {
        self.peak_index().map(|i| self.power[i])
    }

    /// All per-period statistics at grid index `idx`.
    pub fn best_at(&self, idx: usize) -> Option<BestFit> {
        if idx >= self.period.len() || !self.power[idx].is_finite() {
            return None;
        }
        Some(BestFit {
            period_days: self.period[idx],
            epoch_btjd: self.transit_time[idx],
            duration_days: self.duration[idx],
            depth: self.depth[idx],
            depth_snr: self.depth_snr[idx],
            power: self.power[idx],
        })
    }

    /// Indices of the `n` strongest local maxima, strongest first.
    pub fn top_peaks(&self, n: usize) -> Vec<usize> {
        let len = self.power.len();
        let mut peaks: Vec<usize> = (0..len)
            .filter(|&i| {
                let p = self.power[i];
                if !p.is_finite() {
                    return false;
                }
                let left = if i > 0 { self.power[i - 1] } else { f64::NEG_INFINITY };
                let right = if i + 1 < len { self.power[i + 1] } else { f64::NEG_INFINITY };
                !(left > p) && !(right >= p)
            })
            .collect();
        peaks.sort_by(|&a, &b| {
            self.power[b]
                .partial_cmp(&self.power[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        peaks.truncate(n);
        peaks
    }

    pub fn duration_at_max_power(&self) -> Option<f64> {
        self.peak_index().map(|i| self.duration[i])
    }

    pub fn depth_at_max_power(&self) -> Option<f64> {
        self.peak_index().map(|i| self.depth[i])
    }
}

impl PeriodogramResult for BlsPeriodogram {
    fn period_at_max_power(&self) -> Option<PeriodValue> {
        self.peak_index()
            .map(|i| PeriodValue::Quantity(Time::new::<day>(self.period[i])))
    }

    fn periods(&self) -> Option<Vec<PeriodValue>> {
        Some(
            self.period
                .iter()
                .map(|&p| PeriodValue::Quantity(Time::new::<day>(p)))
                .collect(),
        )
    }

    fn power(&self) -> Option<&[f64]> {
        Some(&self.power)
    }

    fn transit_time_at_max_power(&self) -> Option<Box<dyn TransitEpoch + '_>> {
        let i = self.peak_index()?;
        Some(Box::new(TessTime::from_btjd(self.transit_time[i])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{SimulationConfig, simulate};
    use crate::domain::{ModelShape, TransitParams};
    use crate::search::extract::extract_best;
    use crate::search::grid::build_search_grid;
    use crate::domain::SearchRange;

    fn box_signal(period: f64, t0: f64, duration: f64, depth: f64) -> LightCurve {
        let time: Vec<f64> = (0..3000).map(|i| 1000.0 + i as f64 * 0.01).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|&t| {
                let phase = (t - t0 + 0.5 * period).rem_euclid(period) - 0.5 * period;
                if phase.abs() < 0.5 * duration { 1.0 - depth } else { 1.0 }
            })
            .collect();
        LightCurve::new(time, flux, None).unwrap()
    }

    #[test]
    fn recovers_noise_free_box() {
        let lc = box_signal(2.5, 1001.3, 0.12, 0.01);
        let grid = build_search_grid(&SearchRange {
            period_min: 1.0,
            period_max: 4.0,
            duration_min: 0.04,
            duration_max: 0.2,
            grid_size: 601,
        })
        .unwrap();
        let bls = BoxLeastSquares::from_lightcurve(&lc).unwrap();
        let pg = bls.power(&grid, Objective::Snr).unwrap();

        let (p, t0) = extract_best(&pg).unwrap();
        assert!((p - 2.5).abs() < 0.01, "period {p}");
        let offset = (t0 - 1001.3).rem_euclid(2.5);
        let offset = offset.min(2.5 - offset);
        assert!(offset < 0.02, "epoch {t0}");
        let depth = pg.depth_at_max_power().unwrap();
        assert!((depth - 0.01).abs() < 0.002, "depth {depth}");
        let duration = pg.duration_at_max_power().unwrap();
        assert!((duration - 0.12).abs() < 0.03, "duration {duration}");
    }

    #[test]
    fn recovers_injected_transit_in_noise() {
        let config = SimulationConfig {
            start_btjd: 1400.0,
            span_days: 27.0,
            cadence_days: 2.0 / 60.0 / 24.0 * 5.0,
            noise_ppm: 500.0,
            seed: 7,
            gap_days: Some((1413.0, 1414.0)),
            shape: ModelShape::Box,
            params: TransitParams {
                rp_rs: 0.1,
                a_rs: 12.0,
                period_days: 3.7,
                t0_days: 1401.1,
                ..TransitParams::default()
            },
        };
        let lc = simulate(&config).unwrap();
        let grid = build_search_grid(&SearchRange {
            period_min: 1.0,
            period_max: 8.0,
            duration_min: 0.05,
            duration_max: 0.3,
            grid_size: 1500,
        })
        .unwrap();
        let pg = BoxLeastSquares::from_lightcurve(&lc)
            .unwrap()
            .power(&grid, Objective::Snr)
            .unwrap();
        let (p, _) = extract_best(&pg).unwrap();
        assert!((p - 3.7).abs() < 0.02, "period {p}");
    }

    #[test]
    fn likelihood_objective_also_peaks_at_true_period() {
        let lc = box_signal(1.7, 1000.4, 0.1, 0.02);
        let grid = build_search_grid(&SearchRange {
            period_min: 0.8,
            period_max: 3.0,
            duration_min: 0.05,
            duration_max: 0.15,
            grid_size: 441,
        })
        .unwrap();
        let pg = BoxLeastSquares::from_lightcurve(&lc)
            .unwrap()
            .power(&grid, Objective::LogLikelihood)
            .unwrap();
        let best = pg.best_at(pg.peak_index().unwrap()).unwrap();
        assert!((best.period_days - 1.7).abs() < 0.01);
        assert!(best.power > 0.0);
        assert!((best.depth - 0.02).abs() < 0.004);
    }

    #[test]
    fn rejects_too_few_points_and_bad_grids() {
        let lc = LightCurve::new(vec![1.0, 2.0], vec![1.0, 1.0], None).unwrap();
        assert_eq!(BoxLeastSquares::from_lightcurve(&lc).unwrap_err().exit_code(), 3);

        let lc = box_signal(2.0, 1000.5, 0.1, 0.01);
        let bls = BoxLeastSquares::from_lightcurve(&lc).unwrap();
        let grid = SearchGrid {
            periods: vec![0.5, 1.0],
            durations: vec![0.1, 0.6],
        };
        assert_eq!(bls.power(&grid, Objective::Snr).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn top_peaks_are_sorted_local_maxima() {
        let pg = BlsPeriodogram {
            objective: Objective::Snr,
            period: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            power: vec![1.0, 3.0, 2.0, f64::NAN, 5.0, 4.0],
            duration: vec![0.1; 6],
            transit_time: vec![0.0; 6],
            depth: vec![0.0; 6],
            depth_err: vec![0.0; 6],
            depth_snr: vec![0.0; 6],
            log_likelihood: vec![0.0; 6],
            durations: vec![0.1],
        };
        assert_eq!(pg.top_peaks(5), vec![4, 1]);
        assert_eq!(pg.top_peaks(1), vec![4]);
    }
}
