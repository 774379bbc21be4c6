//! Data acquisition: archive search/download, product readers and synthetic
//! light curves.

pub mod fits;
pub mod mast;
pub mod sample;
pub mod source;

pub use source::*;

use std::path::Path;

use crate::domain::LightCurve;
use crate::error::AppError;

/// Read a downloaded product, dispatching on the file extension.
///
/// `.csv` files go through the CSV reader; everything else is treated as a
/// TESS FITS light curve.
pub fn read_product(path: &Path, quality_bitmask: u32) -> Result<LightCurve, AppError> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        return Ok(crate::io::csv_to_lightcurve(path)?.lc);
    }
    Ok(fits::read_tess_lightcurve(path, quality_bitmask)?)
}
