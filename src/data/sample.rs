//! Synthetic light curve generation.
//!
//! Produces an evenly sampled TESS-like series with white Gaussian noise and an
//! injected transit. Output is deterministic for a given seed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::domain::{LightCurve, LightCurveMeta, ModelShape, TransitParams};
use crate::error::AppError;
use crate::models::transit_model;

/// Upper bound on generated samples for synthetic grids.
pub const MAX_SAMPLES: usize = 10_000_000;

/// Number of samples in `[0, span]` at `step`, inclusive of both ends.
pub fn sample_count(span_days: f64, step_days: f64) -> Result<usize, AppError> {
    let n = (span_days / step_days).floor() + 1.0;
    if !n.is_finite() || n > MAX_SAMPLES as f64 {
        return Err(AppError::usage(format!(
            "Cadence too fine: {span_days} d at {step_days} d steps exceeds {MAX_SAMPLES} samples."
        )));
    }
    Ok(n as usize)
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub start_btjd: f64,
    pub span_days: f64,
    pub cadence_days: f64,
    /// Per-point white noise, parts per million of the normalized flux.
    pub noise_ppm: f64,
    pub seed: u64,
    /// Optional `[start, end)` interval with no data (e.g. a downlink gap).
    pub gap_days: Option<(f64, f64)>,
    pub shape: ModelShape,
    pub params: TransitParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_btjd: 1325.0,
            span_days: 27.0,
            cadence_days: 2.0 / 60.0 / 24.0,
            noise_ppm: 1000.0,
            seed: 42,
            gap_days: None,
            shape: ModelShape::Auto,
            params: TransitParams {
                t0_days: 1326.5,
                ..TransitParams::default()
            },
        }
    }
}

pub fn simulate(config: &SimulationConfig) -> Result<LightCurve, AppError> {
    if !(config.span_days.is_finite() && config.span_days > 0.0) {
        return Err(AppError::usage("Simulation span must be > 0 days."));
    }
    if !(config.cadence_days.is_finite() && config.cadence_days > 0.0) {
        return Err(AppError::usage("Simulation cadence must be > 0 days."));
    }
    if !(config.noise_ppm.is_finite() && config.noise_ppm >= 0.0) {
        return Err(AppError::usage("Noise level must be >= 0 ppm."));
    }
    if !config.start_btjd.is_finite() {
        return Err(AppError::usage("Simulation start time must be finite."));
    }

    let n = sample_count(config.span_days, config.cadence_days)?;
    let time: Vec<f64> = (0..n)
        .map(|i| config.start_btjd + i as f64 * config.cadence_days)
        .filter(|t| match config.gap_days {
            Some((lo, hi)) => !(*t >= lo && *t < hi),
            None => true,
        })
        .collect();
    if time.is_empty() {
        return Err(AppError::no_data("Simulation gap removes every sample."));
    }

    let model = transit_model(&time, &config.params, config.shape)?;

    let sigma = config.noise_ppm * 1e-6;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, sigma.max(f64::MIN_POSITIVE))
        .map_err(|e| AppError::runtime(format!("Noise distribution error: {e}")))?;

    let flux: Vec<f64> = model
        .iter()
        .map(|m| if sigma > 0.0 { m + normal.sample(&mut rng) } else { *m })
        .collect();
    let flux_err = if sigma > 0.0 {
        Some(vec![sigma; flux.len()])
    } else {
        None
    };

    info!(
        n_points = time.len(),
        noise_ppm = config.noise_ppm,
        period = config.params.period_days,
        "simulated light curve"
    );

    let meta = LightCurveMeta {
        target: Some("simulated".to_string()),
        sector: None,
        author: None,
        exptime_s: Some(config.cadence_days * 86_400.0),
    };
    Ok(LightCurve::new(time, flux, flux_err)?.with_meta(meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            start_btjd: 2000.0,
            span_days: 10.0,
            cadence_days: 0.01,
            noise_ppm: 200.0,
            seed: 11,
            gap_days: None,
            shape: ModelShape::Box,
            params: TransitParams {
                t0_days: 2001.0,
                period_days: 2.0,
                ..TransitParams::default()
            },
        }
    }

    #[test]
    fn same_seed_same_series() {
        let a = simulate(&config()).unwrap();
        let b = simulate(&config()).unwrap();
        assert_eq!(a.flux, b.flux);
        let c = simulate(&SimulationConfig { seed: 12, ..config() }).unwrap();
        assert_ne!(a.flux, c.flux);
    }

    #[test]
    fn tiny_cadence_is_a_usage_error() {
        let err = simulate(&SimulationConfig {
            cadence_days: 1e-300,
            ..config()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(sample_count(1.0, 0.25).unwrap(), 5);
        assert!(sample_count(1.0, 0.5 / MAX_SAMPLES as f64).is_err());
    }

    #[test]
    fn samples_are_even_and_gap_is_removed() {
        let lc = simulate(&SimulationConfig {
            gap_days: Some((2004.0, 2005.0)),
            ..config()
        })
        .unwrap();
        assert!(lc.time.iter().all(|t| !(2004.0..2005.0).contains(t)));
        assert!((lc.time[1] - lc.time[0] - 0.01).abs() < 1e-12);
        assert!(lc.len() < 1001);
        assert!(lc.flux_err.iter().all(|e| (*e - 2e-4).abs() < 1e-15));
    }

    #[test]
    fn noiseless_series_shows_transit_depth() {
        let lc = simulate(&SimulationConfig {
            noise_ppm: 0.0,
            ..config()
        })
        .unwrap();
        let min = lc.flux.iter().copied().fold(f64::INFINITY, f64::min);
        assert!((min - (1.0 - 0.01)).abs() < 1e-12);
        assert!(lc.flux_err.iter().all(|e| e.is_nan()));
    }

    #[test]
    fn rejects_bad_cadence() {
        let err = simulate(&SimulationConfig {
            cadence_days: 0.0,
            ..config()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
