//! # Observing site geometry
//!
//! This module provides the [`Site`] type: the geodetic position of the telescope that produced
//! a report, its **geocentric parallax coordinates** (ρ·cosφ, ρ·sinφ), and its inertial state
//! vector at a given local sidereal time.
//!
//! ## Units
//!
//! - Latitude, longitude: **degrees** (east positive).
//! - Altitude: **meters** above the reference ellipsoid.
//! - Geocentric parallax (ρ·cosφ, ρ·sinφ): **Earth radii**.
//! - Inertial positions: **km**, velocities: **km/s** (from `ω × r`).
//!
//! The inertial frame is the equator and equinox of date; the x axis points to the equinox,
//! so the site meridian sits at the local sidereal time.
//!
//! ## See also
//! ------------
//! * [`geodetic_to_parallax`] – Geodetic latitude/altitude → (ρ·cosφ, ρ·sinφ).
//! * [`FrameTransform::local_sidereal_time`](crate::ref_system::FrameTransform::local_sidereal_time)
//!   – Provides the sidereal time used by [`Site::inertial_state`].

use nalgebra::Vector3;
use ordered_float::NotNan;

use crate::constants::{
    Degree, Hour, Kilometer, Meter, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS, EARTH_ROTATION_RATE, RADH,
};
use crate::geocheck_errors::GeoCheckError;

/// Ground-based observing site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    /// Geodetic latitude (degrees)
    pub latitude: NotNan<f64>,
    /// East longitude (degrees)
    pub longitude: NotNan<f64>,
    /// Height above the ellipsoid (meters)
    pub altitude: NotNan<f64>,
    /// ρ·cosφ, in Earth radii
    pub rho_cos_phi: NotNan<f64>,
    /// ρ·sinφ, in Earth radii
    pub rho_sin_phi: NotNan<f64>,
}

impl Site {
    /// Create a new site from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: geodetic latitude in degrees, within [-90, 90]
    /// * `longitude`: east longitude in degrees
    /// * `altitude`: height above the ellipsoid in meters
    ///
    /// Return
    /// ----------
    /// * The site with its parallax coordinates precomputed, or
    ///   [`GeoCheckError::InvalidParameter`] / [`GeoCheckError::InvalidFloatValue`] when an input
    ///   is out of range or NaN.
    pub fn new(latitude: Degree, longitude: Degree, altitude: Meter) -> Result<Site, GeoCheckError> {
        let latitude = NotNan::new(latitude)?;
        if latitude.abs() > 90.0 {
            return Err(GeoCheckError::InvalidParameter(format!(
                "site latitude out of range: {latitude}"
            )));
        }
        let (rho_cos_phi, rho_sin_phi) = geodetic_to_parallax(latitude.into_inner(), altitude);

        Ok(Site {
            latitude,
            longitude: NotNan::new(longitude)?,
            altitude: NotNan::new(altitude)?,
            rho_cos_phi: NotNan::new(rho_cos_phi)?,
            rho_sin_phi: NotNan::new(rho_sin_phi)?,
        })
    }

    pub fn longitude(&self) -> Degree {
        self.longitude.into_inner()
    }

    /// Geocentric position and velocity of the site in the equatorial frame of date.
    ///
    /// Arguments
    /// -----------------
    /// * `lst`: local sidereal time of the site (hours)
    ///
    /// Return
    /// ----------
    /// * `(position [km], velocity [km/s])`, the velocity being `ω × r` for the Earth rotation
    ///   vector `ω = (0, 0, ω⊕)`.
    pub fn inertial_state(&self, lst: Hour) -> (Vector3<Kilometer>, Vector3<f64>) {
        let re_km = EARTH_MAJOR_AXIS / 1000.0;
        let (s, c) = (lst * RADH).sin_cos();
        let rho_cos = self.rho_cos_phi.into_inner();

        let position = Vector3::new(
            re_km * rho_cos * c,
            re_km * rho_cos * s,
            re_km * self.rho_sin_phi.into_inner(),
        );
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE);
        let velocity = omega.cross(&position);

        (position, velocity)
    }
}

/// Convert geodetic latitude (radians) and height (meters) into parallax coordinates.
///
/// ```text
/// u = atan( (sin φ * (b/a)) / cos φ )
/// ρ_sinφ = (b/a) * sin u + (h/a) * sin φ
/// ρ_cosφ = cos u + (h/a) * cos φ
/// ```
///
/// where `a` and `b` are the Earth's semi-major and semi-minor axes,
/// and `h` is the height above the ellipsoid.
pub fn lat_alt_to_parallax(lat: f64, height: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // parametric latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// Same as [`lat_alt_to_parallax`] with the latitude in degrees.
pub fn geodetic_to_parallax(lat: Degree, height: Meter) -> (f64, f64) {
    lat_alt_to_parallax(lat.to_radians(), height)
}
