#![allow(dead_code)]

use std::collections::BTreeSet;
use std::ops::Range;

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;

use geocheck::catalog::{CatalogEphemeris, CatalogMatch, CatalogMatcher};
use geocheck::constants::{Degree, Hour, MJD};
use geocheck::geocheck_errors::GeoCheckError;
use geocheck::observations::Measurement;
use geocheck::observers::Site;
use geocheck::orbit_fit::{OrbitFit, OrbitFitter, TopocentricGeometry};
use geocheck::orbit_type::keplerian_element::KeplerianElements;
use geocheck::reference_elements::ElementSet;

pub fn geo_orbit(mean_anomaly: Degree) -> KeplerianElements {
    KeplerianElements {
        reference_epoch: Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 0, 0),
        semi_major_axis: 42_164.17,
        eccentricity: 0.000_25,
        inclination: 0.05,
        ascending_node_longitude: 87.5,
        periapsis_argument: 12.25,
        mean_anomaly,
    }
}

pub fn assert_elements_close(actual: &ElementSet, expected: &KeplerianElements, epsilon: f64) {
    assert_relative_eq!(actual.a, expected.semi_major_axis, epsilon = epsilon);
    assert_relative_eq!(actual.e, expected.eccentricity, epsilon = epsilon);
    assert_relative_eq!(actual.i, expected.inclination, epsilon = epsilon);
    assert_relative_eq!(actual.raan, expected.ascending_node_longitude, epsilon = epsilon);
    assert_relative_eq!(actual.argp, expected.periapsis_argument, epsilon = epsilon);
}

struct ScriptedObject {
    object: CatalogMatch,
    orbit: KeplerianElements,
    sublon: Degree,
    ra_window: Range<Hour>,
    ephemeris: bool,
}

/// Catalog matching measurements by right-ascension window; ephemerides come from a fixed
/// Keplerian orbit per object.
#[derive(Default)]
pub struct ScriptedCatalog {
    objects: Vec<ScriptedObject>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(
        mut self,
        object: CatalogMatch,
        orbit: KeplerianElements,
        sublon: Degree,
        ra_window: Range<Hour>,
    ) -> Self {
        self.objects.push(ScriptedObject {
            object,
            orbit,
            sublon,
            ra_window,
            ephemeris: true,
        });
        self
    }

    /// An object that is matched but whose ephemeris is never available.
    pub fn with_lost_object(mut self, object: CatalogMatch, ra_window: Range<Hour>) -> Self {
        self.objects.push(ScriptedObject {
            object,
            orbit: geo_orbit(0.0),
            sublon: 0.0,
            ra_window,
            ephemeris: false,
        });
        self
    }
}

impl CatalogMatcher for ScriptedCatalog {
    fn match_objects(&self, _epoch: Epoch, measurements: &[&Measurement]) -> Vec<Option<CatalogMatch>> {
        measurements
            .iter()
            .map(|m| {
                self.objects
                    .iter()
                    .find(|o| o.ra_window.contains(&m.ra))
                    .map(|o| o.object.clone())
            })
            .collect()
    }

    fn ephemeris(&self, object: &CatalogMatch, epoch: Epoch) -> Result<CatalogEphemeris, GeoCheckError> {
        let scripted = self
            .objects
            .iter()
            .find(|o| &o.object == object && o.ephemeris)
            .ok_or_else(|| GeoCheckError::EphemerisUnavailable(object.label()))?;
        let (position, velocity) = scripted.orbit.state_at(epoch)?;
        Ok(CatalogEphemeris {
            position,
            velocity,
            sublon: scripted.sublon,
        })
    }
}

/// Fitter returning a fixed orbit with residuals `0.1 * k` / `-0.05 * k` (arcsec).
pub struct ScriptedFitter {
    pub orbit: KeplerianElements,
    pub tan_outliers: BTreeSet<usize>,
    pub fail: bool,
}

impl ScriptedFitter {
    pub fn new(orbit: KeplerianElements) -> Self {
        ScriptedFitter {
            orbit,
            tan_outliers: BTreeSet::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        ScriptedFitter {
            fail: true,
            ..Self::new(geo_orbit(0.0))
        }
    }
}

impl OrbitFitter for ScriptedFitter {
    fn fit_orbit(
        &self,
        ra: &[Hour],
        _dec: &[Degree],
        _mjd: &[MJD],
        _site: &Site,
    ) -> Result<OrbitFit, GeoCheckError> {
        if self.fail {
            return Err(GeoCheckError::OrbitFitFailed("scripted failure".into()));
        }
        Ok(OrbitFit {
            orbit: self.orbit.clone(),
            tan_residuals: (0..ra.len()).map(|k| 0.1 * k as f64).collect(),
            norm_residuals: (0..ra.len()).map(|k| -0.05 * k as f64).collect(),
            tan_sigma: 0.5,
            norm_sigma: 0.5,
            tan_outliers: self.tan_outliers.clone(),
            norm_outliers: BTreeSet::new(),
        })
    }

    fn topocentric_geometry(
        &self,
        _orbit: &KeplerianElements,
        _mjd: MJD,
        _site: &Site,
    ) -> Result<TopocentricGeometry, GeoCheckError> {
        Ok(TopocentricGeometry {
            range: 38_000.0,
            phase: 30.0,
        })
    }
}

/// A `.res` measurement line on 2014-05-12.
pub fn res_line(hour: u32, minute: u32, ra: Hour, dec: Degree, mag: f64) -> String {
    let pack = |value: f64, lead: u32| {
        let cs = (value.abs() * 360_000.0).round() as u64;
        format!(
            "{:0w$}{:02}{:04}",
            cs / 360_000,
            (cs / 6_000) % 60,
            cs % 6_000,
            w = lead as usize
        )
    };
    let sign = if dec < 0.0 { '-' } else { '+' };
    format!(
        "20140512 {hour:02}{minute:02}0000 {} {sign}{} {:04}",
        pack(ra, 2),
        pack(dec, 2),
        (mag * 100.0).round() as u32
    )
}

/// Measurements every `step` minutes from `start` (hour, minute), at slowly drifting positions.
pub fn res_series(header: &str, start: (u32, u32), count: u32, step: u32, ra0: Hour) -> String {
    let mut lines = vec![header.to_string()];
    for k in 0..count {
        let minutes = start.0 * 60 + start.1 + k * step;
        lines.push(res_line(
            minutes / 60,
            minutes % 60,
            ra0 + 0.002 * k as f64,
            -6.2 + 0.0005 * k as f64,
            12.5,
        ));
    }
    lines.join("\n") + "\n"
}

pub fn write_report(dir: &Utf8Path, name: &str, series: &[String]) -> Utf8PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, series.join("\n")).unwrap();
    path
}

pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}
