//! Synthetic transit light curves.
//!
//! Two shapes are provided:
//! - a periodic box of depth `rp_rs^2` lasting the full T14 duration
//! - a limb-darkened occultation of a stellar disk by an opaque planet on a
//!   Keplerian orbit
//!
//! `transit_model` picks between them according to `ModelShape`.

use std::f64::consts::PI;

use tracing::warn;

use crate::domain::{LimbDarkening, ModelShape, TransitParams};
use crate::error::AppError;

use super::orbit::sky_positions;

/// Radial steps used to integrate the occulted intensity.
const RADIAL_STEPS: usize = 200;

/// Total transit duration T14 in hours.
///
/// Uses the standard expression with the eccentricity correction
/// `sqrt(1 - e^2) / (1 + e sin ω)`. A non-transiting geometry returns `0.0`.
pub fn transit_duration_hours(params: &TransitParams) -> f64 {
    let a = params.a_rs.max(1e-6);
    let k = params.rp_rs;
    let inc = params.inc_deg.to_radians();
    let e = params.ecc;
    let omega = params.omega_deg.to_radians();
    let ecc_factor = (1.0 - e * e).sqrt() / (1.0 + e * omega.sin());

    let b = a * inc.cos() * (1.0 - e * e) / (1.0 + e * omega.sin());
    let chord = (1.0 + k).powi(2) - b * b;
    if chord <= 0.0 {
        return 0.0;
    }
    let arg = (chord.sqrt() / (a * inc.sin())).clamp(0.0, 1.0);
    let t14_days = params.period_days / PI * arg.asin() * ecc_factor;
    24.0 * t14_days
}

/// Periodic box transit: `1 - rp_rs^2` within `duration/2` of any transit centre.
///
/// A non-positive or non-finite period yields a single transit at `t0`.
pub fn box_transit(time: &[f64], rp_rs: f64, t0: f64, duration_days: f64, period_days: f64) -> Vec<f64> {
    let depth = rp_rs * rp_rs;
    let half = duration_days / 2.0;
    let periodic = period_days.is_finite() && period_days > 0.0;

    time.iter()
        .map(|&t| {
            let dt = if periodic {
                let phase = (t - t0).rem_euclid(period_days);
                phase.min(period_days - phase)
            } else {
                (t - t0).abs()
            };
            if dt <= half { 1.0 - depth } else { 1.0 }
        })
        .collect()
}

/// Fraction of the stellar flux hidden by a disk of radius `p` at separation `z`.
///
/// Both lengths are in stellar radii.
pub fn occulted_fraction(z: f64, p: f64, ld: LimbDarkening) -> f64 {
    if p <= 0.0 || z >= 1.0 + p {
        return 0.0;
    }
    let r_lo = (z - p).max(0.0);
    let r_hi = (z + p).min(1.0);
    if r_hi <= r_lo {
        return 0.0;
    }

    let dr = (r_hi - r_lo) / RADIAL_STEPS as f64;
    let mut blocked = 0.0;
    for i in 0..RADIAL_STEPS {
        let r = r_lo + (i as f64 + 0.5) * dr;
        blocked += intensity_at(r, ld) * 2.0 * r * arc_half_angle(r, z, p) * dr;
    }

    (blocked / total_flux(ld)).clamp(0.0, 1.0)
}

/// Limb-darkened model flux for each time.
pub fn limb_darkened_transit(time: &[f64], params: &TransitParams) -> Vec<f64> {
    let offsets = exposure_offsets(params);
    let n_sub = offsets.len() as f64;

    time.iter()
        .map(|&t| {
            let sub_times: Vec<f64> = offsets.iter().map(|dt| t + dt).collect();
            let flux: f64 = sky_positions(&sub_times, params)
                .iter()
                .map(|pos| {
                    if pos.in_front {
                        1.0 - occulted_fraction(pos.z, params.rp_rs, params.limb_darkening)
                    } else {
                        1.0
                    }
                })
                .sum();
            flux / n_sub
        })
        .collect()
}

/// Evaluate a transit model of the requested shape.
///
/// `Auto` uses the limb-darkened model when the parameters are physical and
/// otherwise falls back to a box using the T14 duration.
pub fn transit_model(time: &[f64], params: &TransitParams, shape: ModelShape) -> Result<Vec<f64>, AppError> {
    match shape {
        ModelShape::Box => box_from_params(time, params),
        ModelShape::LimbDarkened => {
            validate_physical(params)?;
            Ok(limb_darkened_transit(time, params))
        }
        ModelShape::Auto => match validate_physical(params) {
            Ok(()) => Ok(limb_darkened_transit(time, params)),
            Err(err) => {
                warn!(reason = %err, "limb-darkened model unavailable; using box transit");
                box_from_params(time, params)
            }
        },
    }
}

fn box_from_params(time: &[f64], params: &TransitParams) -> Result<Vec<f64>, AppError> {
    if !(params.rp_rs.is_finite() && params.rp_rs >= 0.0) {
        return Err(AppError::usage(format!("Invalid rp_rs: {}", params.rp_rs)));
    }
    if !params.t0_days.is_finite() {
        return Err(AppError::usage("Transit epoch must be finite."));
    }
    let duration_days = transit_duration_hours(params) / 24.0;
    Ok(box_transit(time, params.rp_rs, params.t0_days, duration_days, params.period_days))
}

fn validate_physical(params: &TransitParams) -> Result<(), AppError> {
    let TransitParams {
        rp_rs,
        a_rs,
        inc_deg,
        period_days,
        t0_days,
        ecc,
        omega_deg,
        ..
    } = *params;

    if ![rp_rs, a_rs, inc_deg, period_days, t0_days, ecc, omega_deg]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(AppError::usage("Transit parameters must be finite."));
    }
    if rp_rs <= 0.0 {
        return Err(AppError::usage(format!("rp_rs must be > 0 (got {rp_rs}).")));
    }
    if a_rs <= 1.0 {
        return Err(AppError::usage(format!("a_rs must be > 1 (got {a_rs}).")));
    }
    if period_days <= 0.0 {
        return Err(AppError::usage(format!("Period must be > 0 (got {period_days}).")));
    }
    if !(0.0..1.0).contains(&ecc) {
        return Err(AppError::usage(format!("Eccentricity must be in [0, 1) (got {ecc}).")));
    }
    if !(inc_deg > 0.0 && inc_deg <= 180.0) {
        return Err(AppError::usage(format!("Inclination must be in (0, 180] (got {inc_deg}).")));
    }
    if let Some(exp) = params.exp_time_days {
        if !(exp.is_finite() && exp >= 0.0) {
            return Err(AppError::usage(format!("Exposure time must be >= 0 (got {exp}).")));
        }
    }
    Ok(())
}

fn exposure_offsets(params: &TransitParams) -> Vec<f64> {
    match (params.exp_time_days, params.supersample_factor) {
        (Some(exp), Some(factor)) if exp > 0.0 && factor > 1 => (0..factor)
            .map(|j| ((j as f64 + 0.5) / factor as f64 - 0.5) * exp)
            .collect(),
        _ => vec![0.0],
    }
}

fn intensity_at(r: f64, ld: LimbDarkening) -> f64 {
    let mu = (1.0 - r * r).max(0.0).sqrt();
    ld.intensity(mu)
}

/// Integral of `I(r) 2πr dr` over the unit disk.
fn total_flux(ld: LimbDarkening) -> f64 {
    match ld {
        LimbDarkening::Uniform => PI,
        LimbDarkening::Linear { u } => PI * (1.0 - u / 3.0),
        LimbDarkening::Quadratic { u1, u2 } => PI * (1.0 - u1 / 3.0 - u2 / 6.0),
    }
}

/// Half-angle of the circle of radius `r` (centred on the star) lying inside
/// the planet disk of radius `p` at separation `z`.
fn arc_half_angle(r: f64, z: f64, p: f64) -> f64 {
    if r <= p - z {
        return PI;
    }
    if r <= z - p || r >= z + p {
        return 0.0;
    }
    let cos_k = (r * r + z * z - p * p) / (2.0 * r * z);
    cos_k.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TransitParams {
        TransitParams {
            rp_rs: 0.1,
            a_rs: 10.0,
            inc_deg: 90.0,
            period_days: 3.0,
            t0_days: 1.0,
            ecc: 0.0,
            omega_deg: 90.0,
            limb_darkening: LimbDarkening::Uniform,
            exp_time_days: None,
            supersample_factor: None,
        }
    }

    #[test]
    fn central_transit_duration_matches_closed_form() {
        let p = params();
        let expected = 24.0 * 3.0 / PI * (1.1_f64 / 10.0).asin();
        assert!((transit_duration_hours(&p) - expected).abs() < 1e-12);
    }

    #[test]
    fn grazing_miss_has_zero_duration() {
        let p = TransitParams {
            inc_deg: 80.0,
            ..params()
        };
        // b = 10 cos(80°) ≈ 1.74 > 1.1
        assert_eq!(transit_duration_hours(&p), 0.0);
    }

    #[test]
    fn box_transit_repeats_every_period() {
        let time = [1.0, 1.04, 1.2, 4.0, 4.04, 7.0, 2.5];
        let dip = 1.0 - 0.1 * 0.1;
        let flux = box_transit(&time, 0.1, 1.0, 0.1, 3.0);
        assert_eq!(flux, vec![dip, dip, 1.0, dip, dip, dip, 1.0]);
    }

    #[test]
    fn box_transit_without_period_is_single_event() {
        let flux = box_transit(&[1.0, 4.0], 0.1, 1.0, 0.1, f64::NAN);
        assert_eq!(flux, vec![1.0 - 0.1 * 0.1, 1.0]);
    }

    #[test]
    fn uniform_disk_central_depth_is_radius_ratio_squared() {
        let frac = occulted_fraction(0.0, 0.1, LimbDarkening::Uniform);
        assert!((frac - 0.01).abs() < 1e-9);
    }

    #[test]
    fn limb_darkening_deepens_central_transit() {
        let uniform = occulted_fraction(0.0, 0.1, LimbDarkening::Uniform);
        let quad = occulted_fraction(0.0, 0.1, LimbDarkening::Quadratic { u1: 0.4, u2: 0.2 });
        assert!(quad > uniform);
    }

    #[test]
    fn no_occultation_outside_contact() {
        assert_eq!(occulted_fraction(1.2, 0.1, LimbDarkening::Uniform), 0.0);
        assert_eq!(occulted_fraction(0.5, 0.0, LimbDarkening::Uniform), 0.0);
    }

    #[test]
    fn limb_darkened_model_dips_at_epoch_only() {
        let p = params();
        let flux = transit_model(&[1.0, 2.0, 4.0], &p, ModelShape::LimbDarkened).unwrap();
        assert!((flux[0] - 0.99).abs() < 1e-6);
        assert_eq!(flux[1], 1.0);
        assert!((flux[2] - 0.99).abs() < 1e-6);
    }

    #[test]
    fn supersampling_smooths_ingress() {
        let p = params();
        let t14 = transit_duration_hours(&p) / 24.0;
        let edge = [1.0 + t14 / 2.0];
        let sharp = limb_darkened_transit(&edge, &p);
        let smooth = limb_darkened_transit(
            &edge,
            &TransitParams {
                exp_time_days: Some(0.02),
                supersample_factor: Some(7),
                ..p
            },
        );
        assert!(sharp[0] > 1.0 - 1e-6);
        assert!(smooth[0] < 1.0 - 1e-4);
    }

    #[test]
    fn auto_falls_back_to_box_for_unphysical_orbit() {
        let p = TransitParams { a_rs: 0.5, ..params() };
        let flux = transit_model(&[1.0, 2.5], &p, ModelShape::Auto).unwrap();
        assert_eq!(flux[1], 1.0);
        assert!(transit_model(&[1.0], &p, ModelShape::LimbDarkened).is_err());
    }
}
