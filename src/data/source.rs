//! Where a light curve comes from.

use std::path::PathBuf;

use crate::data::mast::{MastClient, search_and_stitch};
use crate::domain::{FetchConfig, LightCurve};
use crate::error::AppError;
use crate::io::csv_to_lightcurve;

/// A provider of a normalized, time-sorted light curve.
pub trait LightCurveSource {
    /// Short human-readable description for logs and reports.
    fn describe(&self) -> String;

    /// Load the light curve and the TESS sectors it covers (possibly none).
    fn load(&self) -> Result<(LightCurve, Vec<u32>), AppError>;
}

/// Stitched SPOC/QLP products from the MAST archive.
pub struct MastSource {
    client: MastClient,
    fetch: FetchConfig,
}

impl MastSource {
    pub fn new(client: MastClient, fetch: FetchConfig) -> Self {
        Self { client, fetch }
    }
}

impl LightCurveSource for MastSource {
    fn describe(&self) -> String {
        format!(
            "MAST {} (author={}, cadence={:?})",
            self.fetch.target, self.fetch.author, self.fetch.cadence
        )
    }

    fn load(&self) -> Result<(LightCurve, Vec<u32>), AppError> {
        search_and_stitch(&self.client, &self.fetch)
    }
}

/// A `time,flux[,flux_err]` CSV on disk, e.g. written by `slc download`.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LightCurveSource for CsvSource {
    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    fn load(&self) -> Result<(LightCurve, Vec<u32>), AppError> {
        let loaded = csv_to_lightcurve(&self.path)?;
        let lc = loaded.lc.sorted_by_time().remove_nans().normalize()?;
        Ok((lc, Vec::new()))
    }
}
