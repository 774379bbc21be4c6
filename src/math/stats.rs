//! NaN-aware summary statistics over flux arrays.
//!
//! Light curves routinely carry NaN rows (gaps, flagged cadences), so every
//! helper here ignores non-finite entries instead of propagating them.

use std::cmp::Ordering;

/// `n` evenly spaced values from `start` to `stop` inclusive.
///
/// The last element is exactly `stop` (no accumulated rounding).
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Median of the finite entries, or `None` if there are none.
pub fn nanmedian(values: &[f64]) -> Option<f64> {
    let v = finite_sorted(values);
    if v.is_empty() {
        return None;
    }
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some(0.5 * (v[mid - 1] + v[mid]))
    } else {
        Some(v[mid])
    }
}

/// Population standard deviation of the finite entries.
pub fn nanstd(values: &[f64]) -> Option<f64> {
    let mut n = 0usize;
    let mut sum = 0.0;
    for &x in values.iter().filter(|x| x.is_finite()) {
        n += 1;
        sum += x;
    }
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    let var = values
        .iter()
        .filter(|x| x.is_finite())
        .map(|x| (x - mean) * (x - mean))
        .sum::<f64>()
        / n as f64;
    Some(var.sqrt())
}

/// Median absolute deviation about `center`.
pub fn median_absolute_deviation(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values
        .iter()
        .filter(|x| x.is_finite())
        .map(|x| (x - center).abs())
        .collect();
    nanmedian(&deviations)
}

/// Median spacing between consecutive increasing samples.
pub fn median_cadence(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let dts: Vec<f64> = times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .collect();
    nanmedian(&dts)
}

/// Index of the largest finite value (first one on ties).
pub fn nanargmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_hits_both_endpoints() {
        let v = linspace(0.3, 20.0, 100);
        assert_eq!(v.len(), 100);
        assert_eq!(v[0], 0.3);
        assert_eq!(v[99], 20.0);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn nanmedian_ignores_nan() {
        assert_eq!(nanmedian(&[3.0, f64::NAN, 1.0, 2.0]), Some(2.0));
        assert_eq!(nanmedian(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(nanmedian(&[f64::NAN]), None);
    }

    #[test]
    fn nanstd_is_population_std() {
        let sd = nanstd(&[1.0, 3.0, f64::NAN]).unwrap();
        assert!((sd - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nanargmax_skips_nan_and_keeps_first_tie() {
        assert_eq!(nanargmax(&[f64::NAN, 2.0, 5.0, 5.0, 1.0]), Some(2));
        assert_eq!(nanargmax(&[f64::NAN, f64::NAN]), None);
        assert_eq!(nanargmax(&[]), None);
    }

    #[test]
    fn median_cadence_of_regular_sampling() {
        let t = [0.0, 0.1, 0.2, 0.3, 1.0];
        assert!((median_cadence(&t).unwrap() - 0.1).abs() < 1e-12);
    }
}
