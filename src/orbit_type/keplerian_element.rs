//! # Keplerian orbital elements
//!
//! This module defines the [`KeplerianElements`] struct, the **classical orbital element
//! representation** of a geocentric orbit, and the conversions needed by the post-processing:
//!
//! - [`KeplerianElements::from_state`] – osculating elements from a geocentric state vector
//!   (catalog ephemerides are given as state vectors).
//! - [`KeplerianElements::state_at`] – two-body propagation back to a state vector.
//! - Derived quantities of the legacy orbit record: period, drift rate, argument of latitude.
//!
//! ## Units
//!
//! - Lengths: **km**
//! - Angles: **degrees**
//! - Gravitational parameter: [`MU_EARTH`] in km³/s²
//!
//! ## Degeneracies
//!
//! - **Circular orbits (`e → 0`)**: periapsis argument ω is measured from the node and becomes
//!   ill-defined; the conversion still returns a value.
//! - **Equatorial orbits (`i → 0`)**: ascending node Ω is set to `0.0`.
//! - **Open orbits (`e ≥ 1`)** are rejected by [`KeplerianElements::from_state`].
//!
//! ## See also
//!
//! - [`principal_angle`] – helper to normalize angular elements.
//! - [`rotmt`] – frame rotations used to reach the orbital plane.

use std::fmt;

use hifitime::Epoch;
use nalgebra::Vector3;

use crate::constants::{Degree, Kilometer, DPI, GEO_PERIOD_MIN, MU_EARTH, RADEG};
use crate::geocheck_errors::GeoCheckError;
use crate::kepler::{eccentric_anomaly, principal_angle, true_anomaly};
use crate::ref_system::rotmt;

/// Geocentric Keplerian orbital elements (osculating, two-body).
///
/// Units
/// -----
/// * `reference_epoch`: UTC epoch of osculation.
/// * `semi_major_axis`: km.
/// * `eccentricity`: unitless.
/// * `inclination`: degrees.
/// * `ascending_node_longitude`: degrees (Ω).
/// * `periapsis_argument`: degrees (ω).
/// * `mean_anomaly`: degrees (M).
#[derive(Debug, PartialEq, Clone)]
pub struct KeplerianElements {
    pub reference_epoch: Epoch,
    pub semi_major_axis: Kilometer,
    pub eccentricity: f64,
    pub inclination: Degree,
    pub ascending_node_longitude: Degree,
    pub periapsis_argument: Degree,
    pub mean_anomaly: Degree,
}

impl KeplerianElements {
    /// Osculating elements of a geocentric state vector.
    ///
    /// The state is rotated into the orbital frame (x axis along the line of nodes), where the
    /// in-plane energy and angular momentum give `a`, `e`, the eccentric anomaly and ω.
    ///
    /// Arguments
    /// -----------------
    /// * `position`: geocentric position (km)
    /// * `velocity`: geocentric velocity (km/s)
    /// * `epoch`: epoch of the state
    ///
    /// Return
    /// ----------
    /// * The elliptic elements, or [`GeoCheckError::DegenerateState`] for a rectilinear or
    ///   open orbit.
    pub fn from_state(
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        epoch: Epoch,
    ) -> Result<Self, GeoCheckError> {
        let ang_mom = position.cross(velocity);
        let elmod = ang_mom.norm();
        if elmod == 0.0 || !elmod.is_finite() {
            return Err(GeoCheckError::DegenerateState(
                "zero angular momentum".to_string(),
            ));
        }
        let elv = ang_mom / elmod;

        let sini = (elv.x * elv.x + elv.y * elv.y).sqrt();
        let ainc = sini.atan2(elv.z);
        let anod = if sini == 0.0 {
            0.0
        } else {
            principal_angle(elv.x.atan2(-elv.y))
        };

        // orbital frame, x axis along the line of nodes
        let rot = rotmt(ainc, 0) * rotmt(anod, 2);
        let xorb = rot * position;
        let vorb = rot * velocity;

        let rv = xorb.x * vorb.x + xorb.y * vorb.y;
        let rs = (xorb.x * xorb.x + xorb.y * xorb.y).sqrt();
        let v2 = vorb.x * vorb.x + vorb.y * vorb.y;

        let reca = 2.0 / rs - v2 / MU_EARTH;
        if reca <= 0.0 {
            return Err(GeoCheckError::DegenerateState(format!(
                "open orbit (1/a = {reca:e} 1/km)"
            )));
        }

        let sma = 1.0 / reca;
        let enne = (MU_EARTH / sma.powi(3)).sqrt();

        let esine = rv / (enne * sma * sma);
        let ecose = v2 * rs / MU_EARTH - 1.0;
        let ecc = (esine * esine + ecose * ecose).sqrt();
        if ecc >= 1.0 {
            return Err(GeoCheckError::DegenerateState(format!(
                "open orbit (e = {ecc})"
            )));
        }

        let anec = esine.atan2(ecose);
        let emme = principal_angle(anec - ecc * anec.sin());

        let x1 = anec.cos() - ecc;
        let x2 = (1.0 - ecc * ecc).sqrt() * anec.sin();
        let xm = (x1 * x1 + x2 * x2).sqrt();
        let (x1, x2) = (x1 / xm, x2 / xm);
        let sinper = x1 * xorb.y - x2 * xorb.x;
        let cosper = x1 * xorb.x + x2 * xorb.y;
        let argper = principal_angle(sinper.atan2(cosper));

        Ok(KeplerianElements {
            reference_epoch: epoch,
            semi_major_axis: sma,
            eccentricity: ecc,
            inclination: ainc / RADEG,
            ascending_node_longitude: anod / RADEG,
            periapsis_argument: argper / RADEG,
            mean_anomaly: emme / RADEG,
        })
    }

    /// Two-body propagation of the elements to `epoch`.
    ///
    /// Return
    /// ----------
    /// * `(position [km], velocity [km/s])` in the frame of the elements.
    pub fn state_at(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), GeoCheckError> {
        let a = self.semi_major_axis;
        let e = self.eccentricity;
        let enne = self.mean_motion();

        let dt = (epoch - self.reference_epoch).to_seconds();
        let mean = self.mean_anomaly * RADEG + enne * dt;
        let ecc_anom = eccentric_anomaly(e, principal_angle(mean))?;

        let (se, ce) = ecc_anom.sin_cos();
        let sq = (1.0 - e * e).sqrt();
        let denom = 1.0 - e * ce;

        let r_pf = Vector3::new(a * (ce - e), a * sq * se, 0.0);
        let v_pf = Vector3::new(-a * enne * se / denom, a * enne * sq * ce / denom, 0.0);

        let to_inertial = rotmt(-self.ascending_node_longitude * RADEG, 2)
            * rotmt(-self.inclination * RADEG, 0)
            * rotmt(-self.periapsis_argument * RADEG, 2);

        Ok((to_inertial * r_pf, to_inertial * v_pf))
    }

    /// Mean motion in rad/s.
    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH / self.semi_major_axis.powi(3)).sqrt()
    }

    /// Orbital period in minutes, `T = 2π √(a³/μ)`.
    pub fn period_minutes(&self) -> f64 {
        DPI / self.mean_motion() / 60.0
    }

    /// Longitude drift rate (deg/day) relative to a geostationary orbit,
    /// `-0.25 (T − 1436.2)`, clipped to ±99.
    pub fn drift_rate(&self) -> f64 {
        (-0.25 * (self.period_minutes() - GEO_PERIOD_MIN)).clamp(-99.0, 99.0)
    }

    /// True anomaly at the reference epoch (degrees, in (-180, 180)).
    pub fn true_anomaly(&self) -> Result<Degree, GeoCheckError> {
        let ecc_anom = eccentric_anomaly(self.eccentricity, self.mean_anomaly * RADEG)?;
        Ok(true_anomaly(self.eccentricity, ecc_anom) / RADEG)
    }

    /// Argument of latitude `ω + ν` (degrees), the "mean longitude" column of the legacy
    /// orbit record. Not reduced to [0, 360).
    pub fn argument_of_latitude(&self) -> Result<Degree, GeoCheckError> {
        Ok(self.periapsis_argument + self.true_anomaly()?)
    }
}

impl fmt::Display for KeplerianElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Keplerian Elements @ epoch: {}", self.reference_epoch)?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(f, "  a   (semi-major axis)       = {:.3} km", self.semi_major_axis)?;
        writeln!(f, "  e   (eccentricity)          = {:.7}", self.eccentricity)?;
        writeln!(f, "  i   (inclination)           = {:.4}°", self.inclination)?;
        writeln!(
            f,
            "  Ω   (longitude of node)     = {:.4}°",
            self.ascending_node_longitude
        )?;
        writeln!(
            f,
            "  ω   (argument of periapsis) = {:.4}°",
            self.periapsis_argument
        )?;
        writeln!(f, "  M   (mean anomaly)          = {:.4}°", self.mean_anomaly)
    }
}
