//! # Reference frames
//!
//! Rotation helpers and the [`FrameTransform`] seam used by the residual engine to bring
//! J2000 astrometry into the frame of date of the catalog ephemerides.
//!
//! ## Conventions
//!
//! - Right ascension in **hours**, declination in **degrees**.
//! - [`rotmt`] builds a *frame* rotation: `rotmt(α, k) · x` gives the components of `x` in a
//!   frame rotated by `α` about axis `k`.
//! - [`MeanOfDate`] applies the IAU 1976 precession and ignores nutation, so its equation of the
//!   equinoxes is zero.

use nalgebra::{Matrix3, Vector3};

use crate::constants::{Degree, Hour, Radian, MJD, RADEG, RADH, RADSEC, T2000};
use crate::time::local_sidereal_time;

/// Rotation matrix of angle `alpha` (radians) about axis `k` (0 = x, 1 = y, 2 = z).
///
/// # Panics
///
/// Panics if `k > 2`, as only axes 0–2 are valid.
pub fn rotmt(alpha: Radian, k: usize) -> Matrix3<f64> {
    let (s, c) = alpha.sin_cos();
    match k {
        0 => Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c),
        1 => Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c),
        2 => Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    }
}

/// Precession matrix from the mean equator and equinox of J2000 to those of date.
///
/// Uses the IAU 1976 angles ζ, z, θ (Lieske et al. 1977):
/// `P = R3(−z) · R2(θ) · R3(−ζ)`.
///
/// Arguments
/// ---------
/// * `tjm`: epoch of date (MJD)
///
/// Return
/// ------
/// * `Matrix3<f64>` mapping J2000 equatorial vectors to mean-of-date equatorial vectors
pub fn prec(tjm: MJD) -> Matrix3<f64> {
    const ZED: [f64; 3] = [2306.2181, 0.30188, 0.017998];
    const ZD: [f64; 3] = [2306.2181, 1.09468, 0.018203];
    const THD: [f64; 3] = [2004.3109, -0.42665, -0.041833];

    let t = (tjm - T2000) / 36525.0;

    let zeta = ((ZED[2] * t + ZED[1]) * t + ZED[0]) * t * RADSEC;
    let z = ((ZD[2] * t + ZD[1]) * t + ZD[0]) * t * RADSEC;
    let theta = ((THD[2] * t + THD[1]) * t + THD[0]) * t * RADSEC;

    rotmt(-z, 2) * rotmt(theta, 1) * rotmt(-zeta, 2)
}

/// Unit vector pointing to (`ra`, `dec`).
pub fn radec_to_unit(ra: Hour, dec: Degree) -> Vector3<f64> {
    let (sa, ca) = (ra * RADH).sin_cos();
    let (sd, cd) = (dec * RADEG).sin_cos();
    Vector3::new(cd * ca, cd * sa, sd)
}

/// Right ascension (hours, [0, 24)) and declination (degrees) of a vector.
pub fn cartesian_to_radec(v: &Vector3<f64>) -> (Hour, Degree) {
    let r = v.norm();
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let ra = v.y.atan2(v.x).rem_euclid(std::f64::consts::TAU) / RADH;
    let dec = (v.z / r).asin() / RADEG;
    (ra, dec)
}

/// Earth-orientation services needed by the residual engine.
///
/// Implementations decide how "of date" is realised (mean or true equator); the catalog
/// ephemerides passed to the engine must be expressed in the same frame.
pub trait FrameTransform {
    /// Convert a J2000 position to the frame of date at `tjm`.
    fn j2000_to_date(&self, ra: Hour, dec: Degree, tjm: MJD) -> (Hour, Degree);

    /// Local sidereal time (hours) at east longitude `longitude` (degrees).
    fn local_sidereal_time(&self, tjm: MJD, longitude: Degree) -> Hour;

    /// Equation of the equinoxes at `tjm`, in hours.
    fn equation_of_equinoxes(&self, _tjm: MJD) -> Hour {
        0.0
    }
}

/// Mean equator and equinox of date.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanOfDate;

impl FrameTransform for MeanOfDate {
    fn j2000_to_date(&self, ra: Hour, dec: Degree, tjm: MJD) -> (Hour, Degree) {
        cartesian_to_radec(&(prec(tjm) * radec_to_unit(ra, dec)))
    }

    fn local_sidereal_time(&self, tjm: MJD, longitude: Degree) -> Hour {
        local_sidereal_time(tjm, longitude)
    }
}
