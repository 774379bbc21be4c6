//! Input/output helpers.
//!
//! - light curve CSV ingest (`ingest`)
//! - CSV exports: light curves, periodograms, models (`export`)
//! - BLS summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
