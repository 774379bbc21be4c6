//! Savitzky–Golay smoothing on sample index.
//!
//! Interior points use fixed convolution weights (the row of the window's
//! pseudo-inverse that yields the polynomial value at the window centre).
//! The first and last half-windows are filled by evaluating a polynomial fitted
//! to the first/last full window, matching the usual `mode="interp"` edge rule.

use crate::error::AppError;
use crate::math::{polyfit, polyval, pseudo_inverse, vandermonde};

/// Convolution weights for the smoothed value at the window centre.
pub fn savgol_coefficients(window: usize, order: usize) -> Result<Vec<f64>, AppError> {
    validate_window(window, order)?;
    let half = (window / 2) as f64;
    let x: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();
    let pinv = pseudo_inverse(&vandermonde(&x, order))
        .ok_or_else(|| AppError::runtime("Savitzky-Golay design matrix is singular."))?;
    Ok(pinv.row(0).iter().copied().collect())
}

/// Smooth `y` with a Savitzky–Golay filter.
///
/// `window` must be odd, greater than `order`, and no longer than `y`.
pub fn savgol_filter(y: &[f64], window: usize, order: usize) -> Result<Vec<f64>, AppError> {
    validate_window(window, order)?;
    let n = y.len();
    if window > n {
        return Err(AppError::usage(format!(
            "Savitzky-Golay window ({window}) is longer than the series ({n})."
        )));
    }

    let weights = savgol_coefficients(window, order)?;
    let half = window / 2;
    let mut out = vec![0.0; n];

    for i in half..n - half {
        let slice = &y[i - half..=i + half];
        out[i] = slice.iter().zip(weights.iter()).map(|(v, w)| v * w).sum();
    }

    let x: Vec<f64> = (0..window).map(|i| i as f64 - half as f64).collect();
    let head = polyfit(&x, &y[..window], order)
        .ok_or_else(|| AppError::runtime("Savitzky-Golay edge fit failed."))?;
    let tail = polyfit(&x, &y[n - window..], order)
        .ok_or_else(|| AppError::runtime("Savitzky-Golay edge fit failed."))?;

    for i in 0..half {
        out[i] = polyval(&head, i as f64 - half as f64);
        let j = n - half + i;
        out[j] = polyval(&tail, (j - (n - window)) as f64 - half as f64);
    }

    Ok(out)
}

fn validate_window(window: usize, order: usize) -> Result<(), AppError> {
    if window % 2 == 0 {
        return Err(AppError::usage(format!("Window length must be odd (got {window}).")));
    }
    if window <= order {
        return Err(AppError::usage(format!(
            "Window length ({window}) must exceed the polynomial order ({order})."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_point_quadratic_weights() {
        // Classic tabulated weights: (-3, 12, 17, 12, -3) / 35.
        let w = savgol_coefficients(5, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b / 35.0).abs() < 1e-10);
        }
    }

    #[test]
    fn filter_preserves_a_quadratic_everywhere() {
        let y: Vec<f64> = (0..40).map(|i| {
            let x = i as f64;
            2.0 + 0.1 * x - 0.003 * x * x
        }).collect();
        let s = savgol_filter(&y, 11, 2).unwrap();
        for (a, b) in s.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn filter_rejects_bad_windows() {
        let y = vec![1.0; 10];
        assert!(savgol_filter(&y, 4, 2).is_err());
        assert!(savgol_filter(&y, 3, 3).is_err());
        assert!(savgol_filter(&y, 11, 2).is_err());
    }
}
