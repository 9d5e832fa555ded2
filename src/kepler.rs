use std::f64::consts::PI;

use crate::constants::{Radian, DPI};
use crate::geocheck_errors::GeoCheckError;

const KEPLER_MAX_ITER: usize = 50;
const KEPLER_TOL: f64 = 1e-14;

/// Principal value of an angle in radians, in [0, 2π).
pub fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}

/// Principal difference between two angles, in [-π, π].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut diff = principal_angle(a) - principal_angle(b);

    if diff > PI {
        diff -= DPI;
    } else if diff < -PI {
        diff += DPI;
    }

    diff
}

/// Solve Kepler's equation `E - e sin E = M` for an elliptic orbit.
///
/// Arguments
/// -----------------
/// * `ecc`: eccentricity, `0 <= e < 1`
/// * `mean_anomaly`: mean anomaly M in radians
///
/// Return
/// ----------
/// * The eccentric anomaly E in radians, in the same revolution as `M`, or
///   [`GeoCheckError::KeplerNoConvergence`] when Newton iterations do not settle.
pub fn eccentric_anomaly(ecc: f64, mean_anomaly: Radian) -> Result<Radian, GeoCheckError> {
    if !(0.0..1.0).contains(&ecc) {
        return Err(GeoCheckError::KeplerNoConvergence { ecc, mean_anomaly });
    }

    let m = angle_diff(mean_anomaly, 0.0);
    let mut e_anom = if ecc < 0.8 { m } else { PI.copysign(m) };

    for _ in 0..KEPLER_MAX_ITER {
        let f = e_anom - ecc * e_anom.sin() - m;
        let delta = f / (1.0 - ecc * e_anom.cos());
        e_anom -= delta;
        if delta.abs() < KEPLER_TOL {
            return Ok(e_anom + (mean_anomaly - m));
        }
    }

    Err(GeoCheckError::KeplerNoConvergence { ecc, mean_anomaly })
}

/// True anomaly from the eccentric anomaly, `ν = 2 atan(√((1+e)/(1−e)) tan(E/2))`.
///
/// The result lies in (-π, π).
pub fn true_anomaly(ecc: f64, eccentric_anomaly: Radian) -> Radian {
    2.0 * (((1.0 + ecc) / (1.0 - ecc)).sqrt() * (eccentric_anomaly / 2.0).tan()).atan()
}
