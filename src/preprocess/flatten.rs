//! Removal of slow stellar and instrumental variability.
//!
//! The trend is a quadratic Savitzky–Golay filter over sample index, fitted
//! separately on each continuous segment (segments break at gaps longer than
//! `break_tolerance` median cadences). Fitting is repeated a few times with
//! points beyond `sigma` robust standard deviations masked, so transits do not
//! pull the trend down; masked points take a trend linearly interpolated in
//! time from their kept neighbours.

use tracing::debug;

use crate::domain::LightCurve;
use crate::error::AppError;
use crate::math::{median_absolute_deviation, median_cadence, nanmedian, savgol_filter};

/// MAD to standard deviation for Gaussian noise.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Residuals below this fraction of the flux level count as an exact fit.
const RELATIVE_RESIDUAL_FLOOR: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenConfig {
    pub window_length: usize,
    pub polyorder: usize,
    pub break_tolerance: f64,
    pub niters: usize,
    pub sigma: f64,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            window_length: 401,
            polyorder: 2,
            break_tolerance: 5.0,
            niters: 3,
            sigma: 3.0,
        }
    }
}

/// Flatten with the default settings and the given window.
pub fn flatten_lightcurve(lc: &LightCurve, window_length: usize) -> Result<LightCurve, AppError> {
    flatten_with(
        lc,
        &FlattenConfig {
            window_length,
            ..FlattenConfig::default()
        },
    )
}

/// Divide flux and flux_err by the fitted trend.
pub fn flatten_with(lc: &LightCurve, config: &FlattenConfig) -> Result<LightCurve, AppError> {
    let trend = fit_trend(lc, config)?;
    Ok(LightCurve {
        time: lc.time.clone(),
        flux: lc.flux.iter().zip(&trend).map(|(f, t)| f / t).collect(),
        flux_err: lc.flux_err.iter().zip(&trend).map(|(e, t)| e / t).collect(),
        meta: lc.meta.clone(),
    })
}

/// Trend for every row; rows with non-finite time or flux get NaN.
pub fn fit_trend(lc: &LightCurve, config: &FlattenConfig) -> Result<Vec<f64>, AppError> {
    let min_window = config.polyorder + 1;
    if config.window_length % 2 == 0 || config.window_length < min_window.max(3) {
        return Err(AppError::usage(format!(
            "Flatten window length must be odd and >= {} (got {}).",
            min_window.max(3),
            config.window_length
        )));
    }

    let rows: Vec<usize> = (0..lc.len())
        .filter(|&i| lc.time[i].is_finite() && lc.flux[i].is_finite())
        .collect();
    let mut trend = vec![f64::NAN; lc.len()];
    if rows.is_empty() {
        return Ok(trend);
    }

    let time: Vec<f64> = rows.iter().map(|&i| lc.time[i]).collect();
    let flux: Vec<f64> = rows.iter().map(|&i| lc.flux[i]).collect();
    let cadence = median_cadence(&time).unwrap_or(f64::INFINITY);
    let segments = segment_on_gaps(&time, cadence, config.break_tolerance);
    debug!(
        n_segments = segments.len(),
        window = config.window_length,
        "flattening light curve"
    );

    for &(start, end) in &segments {
        let seg_trend = segment_trend(&time[start..end], &flux[start..end], config)?;
        for (k, value) in seg_trend.into_iter().enumerate() {
            trend[rows[start + k]] = value;
        }
    }
    Ok(trend)
}

/// Split sorted times into `[start, end)` runs with no step above
/// `gap_factor * cadence`.
pub fn segment_on_gaps(time: &[f64], cadence: f64, gap_factor: f64) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    if time.is_empty() {
        return bounds;
    }
    let threshold = cadence * gap_factor;
    let mut start = 0;
    for i in 1..time.len() {
        if time[i] - time[i - 1] > threshold {
            bounds.push((start, i));
            start = i;
        }
    }
    bounds.push((start, time.len()));
    bounds
}

fn segment_trend(time: &[f64], flux: &[f64], config: &FlattenConfig) -> Result<Vec<f64>, AppError> {
    let mut keep = vec![true; flux.len()];
    let mut trend = vec![f64::NAN; flux.len()];

    for iter in 0..config.niters.max(1) {
        let kept: Vec<usize> = (0..flux.len()).filter(|&i| keep[i]).collect();
        let window = fitting_window(config.window_length, kept.len());
        let kept_flux: Vec<f64> = kept.iter().map(|&i| flux[i]).collect();

        let kept_trend = match window {
            Some(w) if w > config.polyorder => savgol_filter(&kept_flux, w, config.polyorder)?,
            _ => {
                let level = nanmedian(&kept_flux).unwrap_or(f64::NAN);
                vec![level; kept.len()]
            }
        };

        let kept_time: Vec<f64> = kept.iter().map(|&i| time[i]).collect();
        trend = time
            .iter()
            .map(|&t| interpolate(&kept_time, &kept_trend, t))
            .collect();
        for (&i, &value) in kept.iter().zip(&kept_trend) {
            trend[i] = value;
        }

        let residual: Vec<f64> = flux.iter().zip(&trend).map(|(f, t)| f - t).collect();
        let Some(mad) = median_absolute_deviation(&residual, 0.0) else {
            break;
        };
        let level = nanmedian(&trend).map(f64::abs).unwrap_or(0.0);
        let limit = (config.sigma * MAD_TO_SIGMA * mad).max(RELATIVE_RESIDUAL_FLOOR * level);
        if limit == 0.0 {
            break;
        }
        let next: Vec<bool> = residual.iter().map(|r| r.abs() <= limit).collect();
        if next == keep || next.iter().filter(|k| **k).count() < 2 {
            debug!(iter, "trend mask converged");
            break;
        }
        keep = next;
    }
    Ok(trend)
}

/// Largest odd window not exceeding either the requested window or `n`.
fn fitting_window(requested: usize, n: usize) -> Option<usize> {
    let w = requested.min(n);
    let w = if w % 2 == 0 { w.checked_sub(1)? } else { w };
    (w > 0).then_some(w)
}

/// Linear interpolation of `(xs, ys)` at `x`, holding the end values outside.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    match xs.len() {
        0 => f64::NAN,
        1 => ys[0],
        _ => {
            let j = xs.partition_point(|&v| v < x);
            if j == 0 {
                ys[0]
            } else if j >= xs.len() {
                ys[xs.len() - 1]
            } else {
                let (x0, x1) = (xs[j - 1], xs[j]);
                let (y0, y1) = (ys[j - 1], ys[j]);
                if x1 == x0 {
                    y0
                } else {
                    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
                }
            }
        }
    }
}
