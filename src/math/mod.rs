//! Mathematical utilities: NaN-aware statistics, least squares, Savitzky–Golay.

pub mod ols;
pub mod savgol;
pub mod stats;

pub use ols::*;
pub use savgol::*;
pub use stats::*;
