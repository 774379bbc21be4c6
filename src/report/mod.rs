//! Reporting utilities: run summaries and peak tables.

pub mod format;

pub use format::*;
