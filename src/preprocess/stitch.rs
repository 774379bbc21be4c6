//! Combining per-sector light curves into one series.

use tracing::info;

use crate::domain::{LightCurve, LightCurveMeta};
use crate::error::AppError;

/// Normalize each segment by its own median, concatenate, sort by time, drop
/// non-finite rows and renormalize the whole series.
pub fn stitch(segments: &[LightCurve]) -> Result<LightCurve, AppError> {
    if segments.is_empty() {
        return Err(AppError::no_data("No light curves to stitch."));
    }

    let mut time = Vec::new();
    let mut flux = Vec::new();
    let mut flux_err = Vec::new();
    for segment in segments {
        let normalized = segment.normalize()?;
        time.extend_from_slice(&normalized.time);
        flux.extend_from_slice(&normalized.flux);
        flux_err.extend_from_slice(&normalized.flux_err);
    }

    let first = &segments[0].meta;
    let meta = LightCurveMeta {
        target: first.target.clone(),
        sector: if segments.len() == 1 { first.sector } else { None },
        author: first.author.clone(),
        exptime_s: first.exptime_s,
    };

    let stitched = LightCurve::new(time, flux, Some(flux_err))?
        .with_meta(meta)
        .sorted_by_time()
        .remove_nans();
    if stitched.is_empty() {
        return Err(AppError::no_data("Stitched light curve has no finite samples."));
    }
    let out = stitched.normalize()?;
    info!(segments = segments.len(), n_points = out.len(), "stitched light curves");
    Ok(out)
}
