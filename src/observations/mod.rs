//! # Measurements and the measurement index
//!
//! A report yields, for each target, an epoch-ordered mapping of [`Measurement`]s
//! ([`Measurements`](crate::constants::Measurements)). Before segmentation the mapping is
//! flattened into a [`TargetSeries`]: parallel arrays of epochs, MJD, angles and magnitudes
//! that tracks index into.
//!
//! ## Submodules
//! -----------------
//! * [`report_format`] – the [`ReportFormat`](report_format::ReportFormat) recognizer seam and
//!   [`load_report`](report_format::load_report).
//! * [`res_reader`] – reader for the legacy `.res` series format.

pub mod report_format;
pub mod res_reader;

use hifitime::Epoch;

use crate::constants::{Degree, Hour, Measurements, TargetTag, MJD};
use crate::time::mjd_utc;

/// A single astrometric measurement.
///
/// # Fields
///
/// * `epoch` - UTC epoch of the exposure
/// * `ra` - right ascension (J2000), in hours
/// * `dec` - declination (J2000), in degrees
/// * `mag` - visual magnitude, if measured
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub epoch: Epoch,
    pub ra: Hour,
    pub dec: Degree,
    pub mag: Option<f64>,
}

impl Measurement {
    pub fn new(epoch: Epoch, ra: Hour, dec: Degree, mag: Option<f64>) -> Self {
        Measurement {
            epoch,
            ra,
            dec,
            mag,
        }
    }
}

/// Epoch-ordered arrays of one target's measurements.
///
/// Tracks are sets of indices into these arrays; the series itself is never mutated once
/// built.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSeries {
    pub tag: TargetTag,
    pub epochs: Vec<Epoch>,
    pub mjd: Vec<MJD>,
    pub ra: Vec<Hour>,
    pub dec: Vec<Degree>,
    pub mag: Vec<Option<f64>>,
}

impl TargetSeries {
    /// Flatten a target's measurement mapping (already ordered by epoch).
    pub fn from_measurements(tag: &TargetTag, measurements: &Measurements) -> Self {
        let n = measurements.len();
        let mut series = TargetSeries {
            tag: tag.clone(),
            epochs: Vec::with_capacity(n),
            mjd: Vec::with_capacity(n),
            ra: Vec::with_capacity(n),
            dec: Vec::with_capacity(n),
            mag: Vec::with_capacity(n),
        };

        for (epoch, m) in measurements {
            series.epochs.push(*epoch);
            series.mjd.push(mjd_utc(epoch));
            series.ra.push(m.ra);
            series.dec.push(m.dec);
            series.mag.push(m.mag);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Integer part of the first MJD, the origin of the time column of the check report.
    pub fn mjd0(&self) -> MJD {
        self.mjd.first().map(|t| t.floor()).unwrap_or(0.0)
    }
}
