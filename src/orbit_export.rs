//! # Legacy orbit record export
//!
//! A fitted orbit can be saved as a single fixed-width, `|`-delimited line read by the
//! downstream GEO catalog tools. The layout is a frozen contract:
//!
//! ```text
//! |  seq | 0 |999|ddmmyyyy|hhmmss.mmm|±lon.l|±dr.d|   a (km)  | T (min) |  incl  |  raan  |   ecc   |  argp  | argp+ν |  +0.00001|  +0.00001|    1 |+0.0000000| mag |std|  seq | 0.1|  1(0.1)|
//! ```
//!
//! * the epoch is rounded to the millisecond and shifted by the equation of the equinoxes,
//! * the drift rate is `-0.25 (T − 1436.2)` deg/day clipped to ±99,
//! * `mag` and `std` are the mean and standard deviation of the observed magnitudes reduced
//!   to 1000 km range and zero phase ([`reduced_magnitude`]).
//!
//! Records are written to `<orbit_dir>/<station>_<object>.orbit`.

use std::fmt;
use std::fs;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::{Epoch, Unit};
use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::{Degree, Hour, Kilometer, TargetTag, RADEG};
use crate::geocheck_errors::GeoCheckError;
use crate::observers::Site;
use crate::orbit_fit::{OrbitFitter, TopocentricGeometry};
use crate::residuals::TrackResiduals;
use crate::time::gregorian_millis;

/// Which fitted orbits are exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SaveOrbit {
    #[default]
    None,
    /// Only tracks without any catalog match
    Uncorrelated,
    All,
}

impl SaveOrbit {
    /// Export decision for a track with a successful fit.
    pub fn accepts(&self, uncorrelated: bool) -> bool {
        match self {
            SaveOrbit::None => false,
            SaveOrbit::Uncorrelated => uncorrelated,
            SaveOrbit::All => true,
        }
    }
}

impl FromStr for SaveOrbit {
    type Err = GeoCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SaveOrbit::None),
            "uncorrelated" => Ok(SaveOrbit::Uncorrelated),
            "all" => Ok(SaveOrbit::All),
            other => Err(GeoCheckError::InvalidParameter(format!(
                "save_orbit must be none, uncorrelated or all, got {other:?}"
            ))),
        }
    }
}

/// Observed magnitude reduced to 1000 km range and zero phase angle.
///
/// `m0 = m − 5 log10(r / 1000) + 2.5 log10(sin φ + (π − φ) cos φ) − 2.5 log10(π / 1600)`
pub fn reduced_magnitude(mag: f64, geometry: &TopocentricGeometry) -> f64 {
    let phase = geometry.phase * RADEG;
    mag - 5.0 * (geometry.range / 1000.0).log10()
        + 2.5 * (phase.sin() + (std::f64::consts::PI - phase) * phase.cos()).log10()
        - 2.5 * (std::f64::consts::PI / 1600.0).log10()
}

/// Reduced magnitudes of a fitted track, measurements without magnitude skipped.
pub fn reduced_magnitudes(result: &TrackResiduals, fitter: &dyn OrbitFitter, site: &Site) -> Vec<f64> {
    let Some(fit) = result.orbit_fit() else {
        return Vec::new();
    };
    result
        .records
        .iter()
        .filter_map(|record| {
            let mag = record.mag?;
            match fitter.topocentric_geometry(&fit.orbit, record.mjd, site) {
                Ok(geometry) => Some(reduced_magnitude(mag, &geometry)),
                Err(e) => {
                    debug!(epoch = %record.epoch, "magnitude skipped: {e}");
                    None
                }
            }
        })
        .filter(|m| m.is_finite())
        .collect()
}

/// One legacy orbit record.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitRecord {
    pub sequence: u32,
    /// Record epoch, already shifted by the equation of the equinoxes
    pub epoch: Epoch,
    pub sublon: Degree,
    /// deg/day
    pub drift_rate: f64,
    pub semi_major_axis: Kilometer,
    /// minutes
    pub period: f64,
    pub inclination: Degree,
    pub raan: Degree,
    pub eccentricity: f64,
    pub periapsis_argument: Degree,
    pub mean_longitude: Degree,
    pub mag_mean: f64,
    pub mag_std: f64,
}

impl OrbitRecord {
    /// Build the record of a fitted track.
    ///
    /// Arguments
    /// -----------------
    /// * `tag`: the target, giving the sequence number
    /// * `result`: the processed track; its fit must be present
    /// * `sublon`: median sub-satellite longitude of the matches, 0 when absent
    /// * `reduced_mags`: reduced magnitudes of the track
    /// * `eqeq`: equation of the equinoxes at the orbit epoch (hours)
    pub fn new(
        tag: &TargetTag,
        result: &TrackResiduals,
        sublon: Option<Degree>,
        reduced_mags: &[f64],
        eqeq: Hour,
    ) -> Result<Self, GeoCheckError> {
        let fit = result
            .orbit_fit()
            .ok_or_else(|| GeoCheckError::OrbitFitFailed(format!("no orbit for target {tag}")))?;
        let orbit = &fit.orbit;

        let (mag_mean, mag_std) = magnitude_stats(reduced_mags);

        Ok(OrbitRecord {
            sequence: tag.sequence_number(),
            epoch: orbit.reference_epoch - Unit::Hour * eqeq,
            sublon: sublon.unwrap_or(0.0),
            drift_rate: orbit.drift_rate(),
            semi_major_axis: orbit.semi_major_axis,
            period: orbit.period_minutes(),
            inclination: orbit.inclination,
            raan: orbit.ascending_node_longitude,
            eccentricity: orbit.eccentricity,
            periapsis_argument: orbit.periapsis_argument,
            mean_longitude: orbit.argument_of_latitude()?,
            mag_mean,
            mag_std,
        })
    }
}

/// Clipped mean and population standard deviation of magnitudes; (0, 0) when empty, std 0
/// for a single value.
fn magnitude_stats(mags: &[f64]) -> (f64, f64) {
    if mags.is_empty() {
        return (0.0, 0.0);
    }
    let n = mags.len() as f64;
    let mean = mags.iter().sum::<f64>() / n;
    let std = if mags.len() > 1 {
        (mags.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n).sqrt()
    } else {
        0.0
    };
    (mean.clamp(-99.9, 99.9), std.clamp(0.0, 9.9))
}

impl fmt::Display for OrbitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day, hour, minute, second, millis) = gregorian_millis(self.epoch);
        write!(
            f,
            "|{:6}| 0 |999|{:02}{:02}{:04}|{:02}{:02}{:02}.{:03}|{:+6.1}|{:+5.1}|{:10.3}|{:9.4}|{:8.4}|{:8.4}|{:9.7}|{:8.4}|{:8.4}",
            self.sequence,
            day,
            month,
            year,
            hour,
            minute,
            second,
            millis,
            self.sublon,
            self.drift_rate,
            self.semi_major_axis,
            self.period,
            self.inclination,
            self.raan,
            self.eccentricity,
            self.periapsis_argument,
            self.mean_longitude,
        )?;
        write!(
            f,
            "|  +0.00001|  +0.00001|    1 |+0.0000000|{:5.1}|{:3.1}|{:6}| 0.1|  1(0.1)|",
            self.mag_mean, self.mag_std, self.sequence
        )
    }
}

/// Path of the orbit file of a target.
pub fn orbit_path(dir: &Utf8Path, tag: &TargetTag) -> Utf8PathBuf {
    dir.join(format!("{}.orbit", tag.file_stem()))
}

/// Write an orbit record, replacing any previous file of the target.
pub fn write_orbit(dir: &Utf8Path, tag: &TargetTag, record: &OrbitRecord) -> Result<Utf8PathBuf, GeoCheckError> {
    let path = orbit_path(dir, tag);
    fs::write(&path, format!("{record}\n"))?;
    info!(target_tag = %tag, "orbit saved to {path}");
    Ok(path)
}

#[cfg(test)]
mod orbit_export_test {
    use super::*;
    use crate::constants::{MU_EARTH, DPI};
    use crate::orbit_type::keplerian_element::KeplerianElements;
    use approx::assert_relative_eq;

    fn geo_record() -> OrbitRecord {
        let a = 42_164.17;
        let period = DPI * (a * a * a / MU_EARTH).sqrt() / 60.0;
        OrbitRecord {
            sequence: 95232,
            epoch: Epoch::from_gregorian_utc(2014, 5, 12, 21, 30, 45, 123_456_789),
            sublon: -15.04,
            drift_rate: -0.25 * (period - 1436.2),
            semi_major_axis: a,
            period,
            inclination: 0.0512,
            raan: 87.5,
            eccentricity: 0.000_312_3,
            periapsis_argument: 12.25,
            mean_longitude: 372.5,
            mag_mean: 11.54,
            mag_std: 0.27,
        }
    }

    #[test]
    fn test_record_layout() {
        let line = geo_record().to_string();
        let fields: Vec<&str> = line.split('|').collect();

        assert!(line.starts_with('|') && line.ends_with('|'));
        assert_eq!(fields.len(), 25);
        assert_eq!(fields[1], " 95232");
        assert_eq!(fields[2], " 0 ");
        assert_eq!(fields[3], "999");
        assert_eq!(fields[4], "12052014");
        assert_eq!(fields[5], "213045.123");
        assert_eq!(fields[6], " -15.0");
        assert_eq!(fields[8], " 42164.170");
        assert_eq!(fields[10], "  0.0512");
        assert_eq!(fields[12], "0.0003123");
        assert_eq!(fields[14], "372.5000");
        assert_eq!(fields[19], " 11.5");
        assert_eq!(fields[20], "0.3");
        assert_eq!(fields[21], " 95232");
        assert_eq!(fields[22], " 0.1");
        assert_eq!(fields[23], "  1(0.1)");
    }

    #[test]
    fn test_record_period_and_drift() {
        let record = geo_record();
        assert_relative_eq!(record.period, 1436.07, epsilon = 0.01);
        let line = record.to_string();
        let fields: Vec<&str> = line.split('|').collect();
        assert_eq!(fields[7], " +0.0");
        assert_eq!(fields[9], "1436.0682");
    }

    #[test]
    fn test_magnitude_stats() {
        assert_eq!(magnitude_stats(&[]), (0.0, 0.0));
        assert_eq!(magnitude_stats(&[12.0]), (12.0, 0.0));
        let (mean, std) = magnitude_stats(&[11.0, 13.0]);
        assert_relative_eq!(mean, 12.0);
        assert_relative_eq!(std, 1.0);
        assert_eq!(magnitude_stats(&[150.0, 250.0]), (99.9, 9.9));
    }

    #[test]
    fn test_reduced_magnitude_reference_geometry() {
        // zero phase: sin 0 + π cos 0 = π
        let geometry = TopocentricGeometry {
            range: 1000.0,
            phase: 0.0,
        };
        assert_relative_eq!(
            reduced_magnitude(12.0, &geometry),
            12.0 + 2.5 * 1600.0_f64.log10(),
            epsilon = 1e-12
        );

        let far = TopocentricGeometry {
            range: 36_000.0,
            phase: 0.0,
        };
        assert_relative_eq!(
            reduced_magnitude(12.0, &geometry) - reduced_magnitude(12.0, &far),
            5.0 * 36.0_f64.log10(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_save_orbit_policy() {
        assert_eq!("ALL".parse::<SaveOrbit>().unwrap(), SaveOrbit::All);
        assert_eq!(" uncorrelated".parse::<SaveOrbit>().unwrap(), SaveOrbit::Uncorrelated);
        assert!("some".parse::<SaveOrbit>().is_err());

        assert!(!SaveOrbit::None.accepts(true));
        assert!(SaveOrbit::Uncorrelated.accepts(true));
        assert!(!SaveOrbit::Uncorrelated.accepts(false));
        assert!(SaveOrbit::All.accepts(false));
    }

    #[test]
    fn test_write_orbit() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        let tag = TargetTag::new(10092u32, 95232u32);

        let path = write_orbit(&dir, &tag, &geo_record()).unwrap();
        assert_eq!(path.file_name(), Some("10092_95232.orbit"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("| 95232| 0 |999|12052014|"));
    }

    #[test]
    fn test_record_from_elements() {
        let orbit = KeplerianElements {
            reference_epoch: Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 0, 0),
            semi_major_axis: 42_164.0,
            eccentricity: 0.0,
            inclination: 0.1,
            ascending_node_longitude: 80.0,
            periapsis_argument: 10.0,
            mean_anomaly: 30.0,
        };
        assert_relative_eq!(orbit.argument_of_latitude().unwrap(), 40.0, epsilon = 1e-9);
    }
}
