//! Least squares polynomial fits.
//!
//! The Savitzky–Golay detrender repeatedly fits low-order polynomials over a
//! sliding window:
//!
//! ```text
//! minimize Σ (y_i - Σ_k c_k x_i^k)^2
//! ```
//!
//! Implementation choices:
//! - SVD rather than QR, because nalgebra's `QR::solve` is meant for square
//!   systems and our Vandermonde matrices are tall.
//! - `x` is centred on the window so the columns stay well scaled.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Vandermonde design matrix with columns `x^0 .. x^order`.
pub fn vandermonde(x: &[f64], order: usize) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), order + 1, |i, k| x[i].powi(k as i32))
}

/// Fit a polynomial of degree `order`; coefficients are lowest power first.
pub fn polyfit(x: &[f64], y: &[f64], order: usize) -> Option<Vec<f64>> {
    if x.len() != y.len() || x.len() <= order {
        return None;
    }
    let design = vandermonde(x, order);
    let rhs = DVector::from_column_slice(y);
    solve_least_squares(&design, &rhs).map(|c| c.iter().copied().collect())
}

/// Evaluate a polynomial (lowest power first) with Horner's rule.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Pseudo-inverse of a tall matrix, via SVD.
pub fn pseudo_inverse(x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let pinv = x.clone().pseudo_inverse(1e-12).ok()?;
    pinv.iter().all(|v| v.is_finite()).then_some(pinv)
}
