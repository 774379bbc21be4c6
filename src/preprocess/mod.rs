//! Light curve cleaning ahead of the transit search.
//!
//! The pipeline order is: stitch sectors, drop outliers, flatten stellar
//! variability. Each step returns a new `LightCurve`.

pub mod flatten;
pub mod mask;
pub mod stitch;

pub use flatten::*;
pub use mask::*;
pub use stitch::*;
