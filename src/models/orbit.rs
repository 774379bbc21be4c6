//! Keplerian sky-projected separation for transit modelling.
//!
//! The reference epoch `t0` is the time of mid-transit, i.e. when the true
//! anomaly equals `π/2 - ω`. From it we back out the time of periastron and
//! then, for any time, solve Kepler's equation for the separation `z` (in
//! stellar radii) between planet and star centres on the sky.

use std::f64::consts::{PI, TAU};

use crate::domain::TransitParams;

/// Solve Kepler's equation `E - e sin E = M` for the eccentric anomaly.
///
/// Newton iteration from `E = M` (or `π` for high eccentricity).
pub fn eccentric_anomaly(e: f64, m: f64) -> f64 {
    let m = m.rem_euclid(TAU);
    if e == 0.0 {
        return m;
    }
    let mut ea = if e < 0.8 { m } else { PI };
    for _ in 0..50 {
        let f = ea - e * ea.sin() - m;
        let d_ea = f / (1.0 - e * ea.cos());
        ea -= d_ea;
        if d_ea.abs() < 1e-13 {
            break;
        }
    }
    ea
}

/// True anomaly from eccentric anomaly (closed orbits).
pub fn true_anomaly(e: f64, ea: f64) -> f64 {
    2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos())
}

/// Time of periastron passage implied by the mid-transit epoch.
pub fn time_of_periastron(params: &TransitParams) -> f64 {
    let e = params.ecc;
    let omega = params.omega_deg.to_radians();
    let f_transit = PI / 2.0 - omega;
    let ea = 2.0 * (((1.0 - e) / (1.0 + e)).sqrt() * (f_transit / 2.0).tan()).atan();
    let m = ea - e * ea.sin();
    params.t0_days - params.period_days / TAU * m
}

/// Projected separation at time `t`, and whether the planet is in front of the star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPosition {
    pub z: f64,
    pub in_front: bool,
}

/// Sky position for each time in `time`.
pub fn sky_positions(time: &[f64], params: &TransitParams) -> Vec<SkyPosition> {
    let e = params.ecc;
    let omega = params.omega_deg.to_radians();
    let sin_i = params.inc_deg.to_radians().sin();
    let t_peri = time_of_periastron(params);

    time.iter()
        .map(|&t| {
            let m = TAU * (t - t_peri) / params.period_days;
            let ea = eccentric_anomaly(e, m);
            let f = true_anomaly(e, ea);
            let r = params.a_rs * (1.0 - e * ea.cos());
            let s = (omega + f).sin();
            let z = r * (1.0 - s * s * sin_i * sin_i).max(0.0).sqrt();
            SkyPosition { z, in_front: s > 0.0 }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kepler_solution_satisfies_equation() {
        for &e in &[0.0, 0.1, 0.5, 0.9] {
            for &m in &[0.1, 1.0, 2.5, 4.0, 6.0] {
                let ea = eccentric_anomaly(e, m);
                let back = (ea - e * ea.sin()).rem_euclid(TAU);
                assert!((back - m).abs() < 1e-10, "e={e} m={m}");
            }
        }
    }

    #[test]
    fn circular_edge_on_orbit_is_centred_at_t0() {
        let params = TransitParams {
            t0_days: 5.0,
            period_days: 2.0,
            a_rs: 10.0,
            inc_deg: 90.0,
            ..TransitParams::default()
        };
        let pos = sky_positions(&[5.0, 6.0], &params);
        assert!(pos[0].z < 1e-9);
        assert!(pos[0].in_front);
        // Half an orbit later the planet is behind the star.
        assert!(!pos[1].in_front);
    }

    #[test]
    fn impact_parameter_matches_a_cos_i() {
        let params = TransitParams {
            t0_days: 0.0,
            a_rs: 8.0,
            inc_deg: 87.0,
            ..TransitParams::default()
        };
        let pos = sky_positions(&[0.0], &params);
        let b = 8.0 * 87.0_f64.to_radians().cos();
        assert!((pos[0].z - b).abs() < 1e-9);
    }

    #[test]
    fn eccentric_orbit_still_transits_at_t0() {
        let params = TransitParams {
            t0_days: 1.0,
            period_days: 4.0,
            a_rs: 12.0,
            inc_deg: 90.0,
            ecc: 0.3,
            omega_deg: 40.0,
            ..TransitParams::default()
        };
        let pos = sky_positions(&[1.0], &params);
        assert!(pos[0].z < 1e-6);
        assert!(pos[0].in_front);
    }
}
