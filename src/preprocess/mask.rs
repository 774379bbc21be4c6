//! Row masks: sigma clipping and TESS quality flags.

use tracing::debug;

use crate::domain::LightCurve;
use crate::math::{nanmedian, nanstd};

/// Keep-mask for fluxes within `sigma` standard deviations of the median.
///
/// Non-finite fluxes are always dropped. When the spread is zero or undefined
/// only the finiteness test applies.
pub fn quality_mask(flux: &[f64], sigma: f64) -> Vec<bool> {
    let (Some(center), Some(std)) = (nanmedian(flux), nanstd(flux)) else {
        return flux.iter().map(|f| f.is_finite()).collect();
    };
    if !std.is_finite() || std == 0.0 {
        return flux.iter().map(|f| f.is_finite()).collect();
    }
    flux.iter()
        .map(|&f| {
            let z = ((f - center) / std).abs();
            f.is_finite() && z.is_finite() && z < sigma
        })
        .collect()
}

/// Drop rows rejected by `quality_mask`.
pub fn remove_outliers(lc: &LightCurve, sigma: f64) -> LightCurve {
    let mask = quality_mask(&lc.flux, sigma);
    let out = lc.select(&mask);
    debug!(sigma, dropped = lc.len() - out.len(), "sigma-clipped outliers");
    out
}

/// Keep-mask for rows whose TESS `QUALITY` flags do not intersect `bitmask`.
pub fn quality_flags_mask(quality: &[i32], bitmask: u32) -> Vec<bool> {
    quality.iter().map(|&q| (q as u32) & bitmask == 0).collect()
}
