//! # Residual engine
//!
//! For one track, the engine
//!
//! 1. converts the J2000 astrometry to the frame of date and computes the hour angle,
//! 2. asks the [`OrbitFitter`] for an orbit and its **internal** residuals,
//! 3. computes the **external** residuals of every matched epoch against the catalog
//!    ephemeris of the matched object,
//! 4. collects the sub-satellite longitudes supplied by the matches.
//!
//! ## Tangential / normal decomposition
//!
//! External residuals are resolved in the line-of-sight frame of the catalog object as seen
//! from the site ([`LosFrame`]): with `(p, v)` the topocentric state of the object,
//!
//! ```text
//! e1 = p / |p|
//! e2 = normalize(v − (v·e1) e1)
//! e3 = e1 × e2
//! ```
//!
//! and `I` the observed direction, the tangential residual is `I·e2` and the normal
//! residual `I·e3`, in arcseconds. An along-track timing error therefore only shows in the
//! tangential component.
//!
//! ## Failure isolation
//!
//! A fit failure is kept in [`TrackResiduals::fit`]; an epoch whose external residual cannot
//! be computed carries a [`ResidualAbsence`]. Neither aborts the track.

use hifitime::Epoch;
use nalgebra::Vector3;
use tracing::warn;

use crate::catalog::{CatalogEphemeris, CatalogMatch, CatalogMatcher, MatchTable};
use crate::constants::{ArcSec, Degree, Hour, MJD, RAD2ARC};
use crate::geocheck_errors::{GeoCheckError, ResidualAbsence};
use crate::observers::Site;
use crate::orbit_fit::{OrbitFit, OrbitFitter};
use crate::ref_system::{radec_to_unit, FrameTransform};
use crate::tracks::Track;

/// Orthonormal line-of-sight frame of a topocentric state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LosFrame {
    /// Line of sight
    pub e1: Vector3<f64>,
    /// Tangential (in-track) direction
    pub e2: Vector3<f64>,
    /// Normal direction
    pub e3: Vector3<f64>,
}

impl LosFrame {
    /// Build the frame from a site-relative position and velocity.
    ///
    /// Return
    /// ----------
    /// * [`ResidualAbsence::DegenerateFrame`] when the position is null or the velocity is
    ///   parallel to the line of sight.
    pub fn from_state(p: &Vector3<f64>, v: &Vector3<f64>) -> Result<Self, ResidualAbsence> {
        let e1 = p
            .try_normalize(f64::EPSILON)
            .ok_or(ResidualAbsence::DegenerateFrame)?;
        let e2 = (v - v.dot(&e1) * e1)
            .try_normalize(f64::EPSILON * v.norm().max(1.0))
            .ok_or(ResidualAbsence::DegenerateFrame)?;
        let e3 = e1.cross(&e2);
        Ok(LosFrame { e1, e2, e3 })
    }

    /// Tangential and normal components (arcsec) of a unit direction.
    pub fn decompose(&self, los: &Vector3<f64>) -> (ArcSec, ArcSec) {
        (los.dot(&self.e2) * RAD2ARC, los.dot(&self.e3) * RAD2ARC)
    }
}

/// Site-relative state of a catalog object.
///
/// Arguments
/// -----------------
/// * `ephemeris`: geocentric state of the object
/// * `site`: observing site
/// * `lst`: local sidereal time of the site (hours)
pub fn topocentric_state(
    ephemeris: &CatalogEphemeris,
    site: &Site,
    lst: Hour,
) -> (Vector3<f64>, Vector3<f64>) {
    let (site_pos, site_vel) = site.inertial_state(lst);
    (ephemeris.position - site_pos, ephemeris.velocity - site_vel)
}

/// Tangential and normal residual (arcsec) of an observed direction against a catalog
/// ephemeris.
///
/// Arguments
/// -----------------
/// * `ephemeris`: geocentric state of the matched object (frame of date)
/// * `site`: observing site
/// * `lst`: local sidereal time of the site (hours)
/// * `ra`, `dec`: observed direction in the frame of date (hours, degrees)
pub fn external_residual(
    ephemeris: &CatalogEphemeris,
    site: &Site,
    lst: Hour,
    ra: Hour,
    dec: Degree,
) -> Result<(ArcSec, ArcSec), ResidualAbsence> {
    let (p, v) = topocentric_state(ephemeris, site, lst);
    let frame = LosFrame::from_state(&p, &v)?;
    Ok(frame.decompose(&radec_to_unit(ra, dec)))
}

/// Internal residual of one point, from the orbit fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalResidual {
    pub tan: ArcSec,
    pub norm: ArcSec,
    pub tan_outlier: bool,
    pub norm_outlier: bool,
}

/// Residuals and context of one measurement of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualRecord {
    pub epoch: Epoch,
    pub mjd: MJD,
    /// Right ascension in the frame of date (hours)
    pub ra: Hour,
    /// Declination in the frame of date (degrees)
    pub dec: Degree,
    /// Hour angle (hours, [0, 24))
    pub ha: Hour,
    pub mag: Option<f64>,
    pub internal: Option<InternalResidual>,
    pub external: Result<(ArcSec, ArcSec), ResidualAbsence>,
    pub object: Option<CatalogMatch>,
    pub sublon: Option<Degree>,
}

impl ResidualRecord {
    /// Internal tangential residual, absent when the fit failed or flagged the point.
    pub fn internal_tan(&self) -> Option<ArcSec> {
        self.internal.filter(|r| !r.tan_outlier).map(|r| r.tan)
    }

    /// Internal normal residual, absent when the fit failed or flagged the point.
    pub fn internal_norm(&self) -> Option<ArcSec> {
        self.internal.filter(|r| !r.norm_outlier).map(|r| r.norm)
    }

    pub fn external_tan(&self) -> Option<ArcSec> {
        self.external.as_ref().ok().map(|r| r.0)
    }

    pub fn external_norm(&self) -> Option<ArcSec> {
        self.external.as_ref().ok().map(|r| r.1)
    }

    /// Display label of the match, empty when unmatched or when the ephemeris failed.
    pub fn match_label(&self) -> String {
        match (&self.object, &self.external) {
            (Some(object), Ok(_)) => object.label(),
            _ => String::new(),
        }
    }
}

/// Output of the residual engine for one track.
#[derive(Debug)]
pub struct TrackResiduals<'a> {
    pub track: Track<'a>,
    pub fit: Result<OrbitFit, GeoCheckError>,
    pub records: Vec<ResidualRecord>,
}

impl TrackResiduals<'_> {
    pub fn orbit_fit(&self) -> Option<&OrbitFit> {
        self.fit.as_ref().ok()
    }

    /// Sub-satellite longitudes supplied by the matches of the track.
    pub fn sublons(&self) -> Vec<Degree> {
        self.records.iter().filter_map(|r| r.sublon).collect()
    }

    /// `true` when no epoch of the track has a match label.
    pub fn is_uncorrelated(&self) -> bool {
        self.records.iter().all(|r| r.match_label().is_empty())
    }

    /// Distinct matched objects, in order of first appearance.
    pub fn matched_objects(&self) -> Vec<&CatalogMatch> {
        let mut objects: Vec<&CatalogMatch> = Vec::new();
        for object in self.records.iter().filter_map(|r| r.object.as_ref()) {
            if !objects.contains(&object) {
                objects.push(object);
            }
        }
        objects
    }
}

/// Collaborators and run data shared by all tracks.
pub struct ResidualEngine<'a> {
    pub site: &'a Site,
    pub frame: &'a dyn FrameTransform,
    pub matcher: &'a dyn CatalogMatcher,
    pub fitter: &'a dyn OrbitFitter,
    pub matches: &'a MatchTable,
}

impl ResidualEngine<'_> {
    /// Compute internal and external residuals of a track.
    pub fn process_track<'t>(&self, track: Track<'t>) -> TrackResiduals<'t> {
        let series = track.series;
        let longitude = self.site.longitude();

        let mut ra_tod = Vec::with_capacity(track.len());
        let mut dec_tod = Vec::with_capacity(track.len());
        let mut lst = Vec::with_capacity(track.len());
        for &i in &track.indices {
            let (ra, dec) = self.frame.j2000_to_date(series.ra[i], series.dec[i], series.mjd[i]);
            ra_tod.push(ra);
            dec_tod.push(dec);
            lst.push(self.frame.local_sidereal_time(series.mjd[i], longitude));
        }

        let mjd = track.mjd();
        let fit = self
            .fitter
            .fit_orbit(&ra_tod, &dec_tod, &mjd, self.site)
            .and_then(|fit| fit.validate(track.len()).map(|_| fit));
        if let Err(e) = &fit {
            warn!(target_tag = %series.tag, measurements = track.len(), "{e}");
        }

        let records = track
            .indices
            .iter()
            .enumerate()
            .map(|(k, &i)| {
                let epoch = series.epochs[i];
                let object = self.matches.get(&series.tag, &epoch).cloned();

                let internal = fit.as_ref().ok().map(|f| InternalResidual {
                    tan: f.tan_residuals[k],
                    norm: f.norm_residuals[k],
                    tan_outlier: f.tan_outliers.contains(&k),
                    norm_outlier: f.norm_outliers.contains(&k),
                });

                let ephemeris = match &object {
                    Some(o) => self.matcher.ephemeris(o, epoch).map_err(ResidualAbsence::from),
                    None => Err(ResidualAbsence::NoMatch),
                };
                let external = ephemeris.as_ref().map_err(Clone::clone).and_then(|eph| {
                    external_residual(eph, self.site, lst[k], ra_tod[k], dec_tod[k])
                });
                if let (Some(o), Err(reason)) = (&object, &external) {
                    warn!(target_tag = %series.tag, %epoch, object = %o, "external residual absent: {reason}");
                }

                ResidualRecord {
                    epoch,
                    mjd: mjd[k],
                    ra: ra_tod[k],
                    dec: dec_tod[k],
                    ha: (lst[k] - ra_tod[k]).rem_euclid(24.0),
                    mag: series.mag[i],
                    internal,
                    external,
                    object,
                    sublon: ephemeris.ok().map(|e| e.sublon),
                }
            })
            .collect();

        TrackResiduals {
            track,
            fit,
            records,
        }
    }
}
