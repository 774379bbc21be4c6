//! TESS light-curve FITS products.
//!
//! HDU 1 is a binary table with `TIME` (BTJD), `PDCSAP_FLUX`, `PDCSAP_FLUX_ERR`
//! and `QUALITY`; the primary header carries `SECTOR` and `OBJECT`. Reading
//! needs cfitsio, so it sits behind the `fits` cargo feature.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::LightCurve;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum FitsError {
    #[error("reading '{}' needs FITS support; rebuild with `--features fits`", .path.display())]
    FeatureDisabled { path: PathBuf },

    #[cfg(feature = "fits")]
    #[error("FITS error in '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("'{}': columns have different lengths", .path.display())]
    ColumnMismatch { path: PathBuf },
}

impl From<FitsError> for AppError {
    fn from(err: FitsError) -> Self {
        AppError::runtime(err.to_string())
    }
}

/// Read PDCSAP flux, dropping cadences whose quality flags hit `quality_bitmask`.
#[cfg(feature = "fits")]
pub fn read_tess_lightcurve(path: &Path, quality_bitmask: u32) -> Result<LightCurve, FitsError> {
    use fitsio::FitsFile;
    use tracing::debug;

    use crate::domain::LightCurveMeta;
    use crate::preprocess::quality_flags_mask;

    let wrap = |source| FitsError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut f = FitsFile::open(path).map_err(wrap)?;
    let primary = f.primary_hdu().map_err(wrap)?;
    let sector = primary
        .read_key::<i64>(&mut f, "SECTOR")
        .ok()
        .and_then(|s| u32::try_from(s).ok());
    let object = primary.read_key::<String>(&mut f, "OBJECT").ok();

    let hdu = f.hdu(1).map_err(wrap)?;
    let time: Vec<f64> = hdu.read_col(&mut f, "TIME").map_err(wrap)?;
    let flux: Vec<f64> = hdu.read_col(&mut f, "PDCSAP_FLUX").map_err(wrap)?;
    let flux_err: Vec<f64> = hdu.read_col(&mut f, "PDCSAP_FLUX_ERR").map_err(wrap)?;
    let quality: Vec<i32> = hdu.read_col(&mut f, "QUALITY").map_err(wrap)?;

    if time.len() != flux.len() || flux.len() != flux_err.len() || flux.len() != quality.len() {
        return Err(FitsError::ColumnMismatch {
            path: path.to_path_buf(),
        });
    }

    let keep = quality_flags_mask(&quality, quality_bitmask);
    let meta = LightCurveMeta {
        target: object,
        sector,
        ..LightCurveMeta::default()
    };
    let lc = LightCurve {
        time,
        flux,
        flux_err,
        meta,
    }
    .select(&keep);
    debug!(path = %path.display(), ?sector, rows = lc.len(), "read FITS light curve");
    Ok(lc)
}

#[cfg(not(feature = "fits"))]
pub fn read_tess_lightcurve(path: &Path, _quality_bitmask: u32) -> Result<LightCurve, FitsError> {
    Err(FitsError::FeatureDisabled {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_convert_to_runtime_exit_code() {
        let err: AppError = FitsError::ColumnMismatch {
            path: PathBuf::from("x.fits"),
        }
        .into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().contains("x.fits"));
    }

    #[cfg(not(feature = "fits"))]
    #[test]
    fn missing_feature_is_named_in_the_error() {
        let err = read_tess_lightcurve(Path::new("tess_lc.fits"), 175).unwrap_err();
        assert!(err.to_string().contains("--features fits"));
    }
}
