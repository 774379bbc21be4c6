//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during cleaning and period search
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Offset between Julian Date and Barycentric TESS Julian Date.
pub const BTJD_OFFSET: f64 = 2_457_000.0;

/// Number of points in the BLS duration grid.
pub const DURATION_STEPS: usize = 30;

/// Default number of points in the BLS period grid.
pub const DEFAULT_GRID_SIZE: usize = 6000;

/// TESS quality flags dropped on read: attitude tweak, safe mode, coarse point,
/// earth point, desaturation event and manual exclude.
pub const DEFAULT_QUALITY_BITMASK: u32 = 175;

/// Exposure-time hint used to filter archive search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// 20 s products (`t_exptime < 60`).
    Fast,
    /// 2 min products (`60 <= t_exptime < 200`).
    Short,
    /// Full-frame cadence (`t_exptime >= 200`).
    Long,
    /// No exposure-time filter.
    Any,
}

impl Cadence {
    /// Whether an exposure time (seconds) belongs to this cadence.
    pub fn matches(self, exptime_s: f64) -> bool {
        match self {
            Cadence::Fast => exptime_s < 60.0,
            Cadence::Short => (60.0..200.0).contains(&exptime_s),
            Cadence::Long => exptime_s >= 200.0,
            Cadence::Any => true,
        }
    }

    pub fn is_filter(self) -> bool {
        self != Cadence::Any
    }
}

/// Statistic maximized by the BLS search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Depth signal-to-noise ratio.
    Snr,
    /// Change in log-likelihood relative to a flat model.
    #[value(name = "likelihood")]
    LogLikelihood,
}

/// Stellar limb-darkening law for the physical transit model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "lowercase")]
pub enum LimbDarkening {
    Uniform,
    Linear { u: f64 },
    Quadratic { u1: f64, u2: f64 },
}

impl LimbDarkening {
    /// Normalized specific intensity at `mu = cos(theta)`.
    pub fn intensity(self, mu: f64) -> f64 {
        let one_minus = 1.0 - mu;
        match self {
            LimbDarkening::Uniform => 1.0,
            LimbDarkening::Linear { u } => 1.0 - u * one_minus,
            LimbDarkening::Quadratic { u1, u2 } => 1.0 - u1 * one_minus - u2 * one_minus * one_minus,
        }
    }
}

/// Limb-darkening law selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LdLaw {
    Uniform,
    Linear,
    Quadratic,
}

impl LdLaw {
    pub fn with_coefficients(self, u1: f64, u2: f64) -> LimbDarkening {
        match self {
            LdLaw::Uniform => LimbDarkening::Uniform,
            LdLaw::Linear => LimbDarkening::Linear { u: u1 },
            LdLaw::Quadratic => LimbDarkening::Quadratic { u1, u2 },
        }
    }
}

/// Which transit model to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelShape {
    /// Limb-darkened model, falling back to a box when the parameters are
    /// outside its domain.
    Auto,
    /// Flat-bottomed box of depth `rp_rs^2`.
    Box,
    /// Keplerian orbit with a limb-darkened stellar disk.
    LimbDarkened,
}

/// Physical parameters of a transiting planet.
///
/// Lengths are in stellar radii, angles in degrees, times in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitParams {
    pub rp_rs: f64,
    pub a_rs: f64,
    pub inc_deg: f64,
    pub period_days: f64,
    pub t0_days: f64,
    pub ecc: f64,
    pub omega_deg: f64,
    pub limb_darkening: LimbDarkening,
    pub exp_time_days: Option<f64>,
    pub supersample_factor: Option<usize>,
}

impl Default for TransitParams {
    fn default() -> Self {
        Self {
            rp_rs: 0.1,
            a_rs: 15.0,
            inc_deg: 90.0,
            period_days: 3.0,
            t0_days: 0.0,
            ecc: 0.0,
            omega_deg: 90.0,
            limb_darkening: LimbDarkening::Quadratic { u1: 0.3, u2: 0.2 },
            exp_time_days: None,
            supersample_factor: None,
        }
    }
}

/// Provenance of a light curve (or of a stitched set of them).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightCurveMeta {
    pub target: Option<String>,
    pub sector: Option<u32>,
    pub author: Option<String>,
    pub exptime_s: Option<f64>,
}

/// A flux time series. Time is in BTJD days.
///
/// `flux_err` always has the same length as `flux`; unknown uncertainties are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurve {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
    pub meta: LightCurveMeta,
}

impl LightCurve {
    pub fn new(time: Vec<f64>, flux: Vec<f64>, flux_err: Option<Vec<f64>>) -> Result<Self, AppError> {
        let flux_err = flux_err.unwrap_or_else(|| vec![f64::NAN; flux.len()]);
        if time.len() != flux.len() || flux.len() != flux_err.len() {
            return Err(AppError::usage(format!(
                "Light curve column lengths differ: time={}, flux={}, flux_err={}.",
                time.len(),
                flux.len(),
                flux_err.len()
            )));
        }
        Ok(Self {
            time,
            flux,
            flux_err,
            meta: LightCurveMeta::default(),
        })
    }

    pub fn with_meta(mut self, meta: LightCurveMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Keep the rows where `mask` is true.
    pub fn select(&self, mask: &[bool]) -> LightCurve {
        let keep = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .zip(mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(x, _)| *x)
                .collect()
        };
        LightCurve {
            time: keep(&self.time),
            flux: keep(&self.flux),
            flux_err: keep(&self.flux_err),
            meta: self.meta.clone(),
        }
    }

    /// Drop rows with a non-finite time or flux.
    pub fn remove_nans(&self) -> LightCurve {
        let mask: Vec<bool> = self
            .time
            .iter()
            .zip(self.flux.iter())
            .map(|(t, f)| t.is_finite() && f.is_finite())
            .collect();
        self.select(&mask)
    }

    /// Sort rows by time (stable for equal timestamps).
    pub fn sorted_by_time(&self) -> LightCurve {
        let mut idx: Vec<usize> = (0..self.len()).collect();
        idx.sort_by(|&a, &b| self.time[a].partial_cmp(&self.time[b]).unwrap_or(Ordering::Equal));
        LightCurve {
            time: idx.iter().map(|&i| self.time[i]).collect(),
            flux: idx.iter().map(|&i| self.flux[i]).collect(),
            flux_err: idx.iter().map(|&i| self.flux_err[i]).collect(),
            meta: self.meta.clone(),
        }
    }

    /// Divide flux and flux_err by the median flux.
    pub fn normalize(&self) -> Result<LightCurve, AppError> {
        let median = crate::math::nanmedian(&self.flux)
            .ok_or_else(|| AppError::no_data("Cannot normalize a light curve without finite flux."))?;
        if median == 0.0 {
            return Err(AppError::runtime("Cannot normalize a light curve with zero median flux."));
        }
        Ok(self.scaled(median))
    }

    pub(crate) fn scaled(&self, divisor: f64) -> LightCurve {
        LightCurve {
            time: self.time.clone(),
            flux: self.flux.iter().map(|f| f / divisor).collect(),
            flux_err: self.flux_err.iter().map(|e| e / divisor).collect(),
            meta: self.meta.clone(),
        }
    }

    /// Offset (days) of each sample from its nearest transit centre, in
    /// `[-period/2, period/2)`.
    pub fn fold_phase(&self, period: f64, epoch: f64) -> Vec<f64> {
        let half = 0.5 * period;
        self.time
            .iter()
            .map(|&t| (t - epoch + half).rem_euclid(period) - half)
            .collect()
    }

    pub fn time_span(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &t in &self.time {
            if t.is_finite() {
                lo = lo.min(t);
                hi = hi.max(t);
            }
        }
        (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
    }
}

/// Period/duration search range in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRange {
    pub period_min: f64,
    pub period_max: f64,
    pub duration_min: f64,
    pub duration_max: f64,
    pub grid_size: usize,
}

impl Default for SearchRange {
    fn default() -> Self {
        Self {
            period_min: 0.3,
            period_max: 20.0,
            duration_min: 0.01,
            duration_max: 0.20,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

/// Where to fetch light curves from and how to filter them.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub target: String,
    pub author: String,
    pub cadence: Cadence,
    pub quality_bitmask: u32,
}

/// Settings for a `slc bls` run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub range: SearchRange,
    pub objective: Objective,
    /// Outlier clip threshold (sigma) applied before flattening.
    pub sigma: f64,
    /// Savitzky–Golay window length (samples, odd).
    pub window_length: usize,
    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            range: SearchRange::default(),
            objective: Objective::Snr,
            sigma: 5.0,
            window_length: 401,
            top_n: 5,
            plot: false,
            plot_width: 100,
            plot_height: 20,
            export: None,
            export_summary: None,
        }
    }
}

/// Best-fit values of a BLS search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    pub period_days: f64,
    pub epoch_btjd: f64,
    pub duration_days: f64,
    pub depth: f64,
    pub depth_snr: f64,
    pub power: f64,
}

/// Portable JSON summary of a BLS run (`--export-summary`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub target: Option<String>,
    pub sectors: Vec<u32>,
    pub n_points: usize,
    pub objective: Objective,
    pub range: SearchRange,
    pub duration_grid: Vec<f64>,
    pub best: BestFit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lc(time: &[f64], flux: &[f64]) -> LightCurve {
        LightCurve::new(time.to_vec(), flux.to_vec(), None).unwrap()
    }

    #[test]
    fn new_rejects_mismatched_columns() {
        let err = LightCurve::new(vec![1.0, 2.0], vec![1.0], None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn remove_nans_drops_bad_rows() {
        let out = lc(&[1.0, 2.0, f64::NAN, 4.0], &[1.0, f64::NAN, 1.0, 2.0]).remove_nans();
        assert_eq!(out.time, vec![1.0, 4.0]);
        assert_eq!(out.flux, vec![1.0, 2.0]);
        assert_eq!(out.flux_err.len(), 2);
    }

    #[test]
    fn normalize_divides_by_median() {
        let out = lc(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]).normalize().unwrap();
        assert_eq!(out.flux, vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn sorted_by_time_reorders_all_columns() {
        let mut input = lc(&[3.0, 1.0, 2.0], &[30.0, 10.0, 20.0]);
        input.flux_err = vec![0.3, 0.1, 0.2];
        let out = input.sorted_by_time();
        assert_eq!(out.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(out.flux, vec![10.0, 20.0, 30.0]);
        assert_eq!(out.flux_err, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn fold_phase_centres_transits_on_zero() {
        let out = lc(&[10.0, 10.4, 12.0, 13.9], &[1.0; 4]).fold_phase(2.0, 10.0);
        let expected = [0.0, 0.4, 0.0, -0.1];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn cadence_buckets_exposure_times() {
        assert!(Cadence::Fast.matches(20.0));
        assert!(Cadence::Short.matches(120.0));
        assert!(!Cadence::Short.matches(200.0));
        assert!(Cadence::Long.matches(1800.0));
        assert!(Cadence::Any.matches(1.0));
    }

    #[test]
    fn quadratic_limb_darkening_dims_the_limb() {
        let ld = LimbDarkening::Quadratic { u1: 0.3, u2: 0.2 };
        assert!((ld.intensity(1.0) - 1.0).abs() < 1e-12);
        assert!((ld.intensity(0.0) - 0.5).abs() < 1e-12);
    }
}
