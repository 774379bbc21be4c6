//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - light-curve containers (`LightCurve`, `LightCurveMeta`)
//! - search/fetch configuration (`SearchRange`, `SearchConfig`, `FetchConfig`)
//! - transit model parameters (`TransitParams`, `LimbDarkening`)
//! - run outputs (`BestFit`, `SummaryFile`)

pub mod types;

pub use types::*;
