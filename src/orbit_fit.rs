//! # Orbit determination seam
//!
//! Orbit fitting is delegated to an [`OrbitFitter`]. The residual engine calls
//! [`OrbitFitter::fit_orbit`] once per track; a failure only removes the internal residuals
//! of that track.
//!
//! The fitter also provides the topocentric geometry (range and phase angle) of its fitted
//! orbit, used to reduce observed magnitudes in the exported orbit record.

use std::collections::BTreeSet;

use crate::constants::{ArcSec, Degree, Hour, Kilometer, MJD};
use crate::geocheck_errors::GeoCheckError;
use crate::observers::Site;
use crate::orbit_type::keplerian_element::KeplerianElements;

/// Result of a successful orbit fit over one track.
///
/// Residual lists are aligned with the track measurements; outlier sets hold indices into
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitFit {
    pub orbit: KeplerianElements,
    pub tan_residuals: Vec<ArcSec>,
    pub norm_residuals: Vec<ArcSec>,
    pub tan_sigma: ArcSec,
    pub norm_sigma: ArcSec,
    pub tan_outliers: BTreeSet<usize>,
    pub norm_outliers: BTreeSet<usize>,
}

impl OrbitFit {
    /// Check that the residual lists match a track of `len` measurements.
    pub fn validate(&self, len: usize) -> Result<(), GeoCheckError> {
        if self.tan_residuals.len() != len || self.norm_residuals.len() != len {
            return Err(GeoCheckError::OrbitFitFailed(format!(
                "residual lists of length {}/{} for a track of {len} measurements",
                self.tan_residuals.len(),
                self.norm_residuals.len()
            )));
        }
        Ok(())
    }
}

/// Topocentric geometry of an orbit at one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopocentricGeometry {
    /// Site-to-object range (km)
    pub range: Kilometer,
    /// Sun-object-observer phase angle (degrees)
    pub phase: Degree,
}

/// Orbit determination collaborator.
pub trait OrbitFitter {
    /// Fit an orbit to a track.
    ///
    /// Arguments
    /// -----------------
    /// * `ra`: right ascensions of the track (hours, frame of date)
    /// * `dec`: declinations (degrees, frame of date)
    /// * `mjd`: UTC epochs
    /// * `site`: observing site
    fn fit_orbit(
        &self,
        ra: &[Hour],
        dec: &[Degree],
        mjd: &[MJD],
        site: &Site,
    ) -> Result<OrbitFit, GeoCheckError>;

    /// Range and phase angle of `orbit` seen from `site` at `mjd`.
    fn topocentric_geometry(
        &self,
        orbit: &KeplerianElements,
        mjd: MJD,
        site: &Site,
    ) -> Result<TopocentricGeometry, GeoCheckError>;
}

/// Fitter used when no orbit determination is configured: every fit fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOrbitFitter;

impl OrbitFitter for NoOrbitFitter {
    fn fit_orbit(
        &self,
        _ra: &[Hour],
        _dec: &[Degree],
        _mjd: &[MJD],
        _site: &Site,
    ) -> Result<OrbitFit, GeoCheckError> {
        Err(GeoCheckError::OrbitFitFailed(
            "no orbit fitter configured".to_string(),
        ))
    }

    fn topocentric_geometry(
        &self,
        _orbit: &KeplerianElements,
        _mjd: MJD,
        _site: &Site,
    ) -> Result<TopocentricGeometry, GeoCheckError> {
        Err(GeoCheckError::OrbitFitFailed(
            "no orbit fitter configured".to_string(),
        ))
    }
}
