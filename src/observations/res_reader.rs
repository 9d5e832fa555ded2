//! # Legacy `.res` series reader
//!
//! Parser for the ad-hoc whitespace-delimited series format produced by the station
//! software. A file holds one or more series:
//!
//! ```text
//! RES 10092 95232
//! 20140512 21304517 05354217 -06123456 1245
//! 20140512 21351020 05360102 -06120011 1251
//!
//! RES 10092 95233
//! ...
//! ```
//!
//! ## Record layout
//! -----------------
//! * **Header** (3 fields): `<ignored> <station id> <series id>` opens a series.
//! * **Measurement** (5 fields): `yyyymmdd hhmmsscc hhmmsscc ±ddmmsscc mmmm`, i.e. date, UTC
//!   time, right ascension (J2000), declination (J2000) and the magnitude in
//!   centi-magnitudes. Time and angles are packed sexagesimal fields decoded by
//!   [`crate::conversion`]. A magnitude of `0` marks a missing value.
//! * **Blank line**: closes the current series.
//!
//! Any other field count, or a measurement outside a series, makes the file unreadable as
//! `.res`.
//!
//! ## See also
//! ------------
//! * [`parse_packed_ra`], [`parse_packed_dec`], [`parse_packed_time`] – field decoders.
//! * [`ResFormat`] – the [`ReportFormat`] implementation built on this reader.

use camino::Utf8Path;
use hifitime::Epoch;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{Measurements, TagField, TargetSet, TargetTag};
use crate::conversion::{parse_packed_date, parse_packed_dec, parse_packed_ra, parse_packed_time};
use crate::geocheck_errors::GeoCheckError;
use crate::observations::report_format::ReportFormat;
use crate::observations::Measurement;

/// Line-level parsing errors for `.res` series files.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ParseResError {
    #[error("Unexpected number of fields: {0}")]
    UnexpectedFieldCount(usize),
    #[error("Measurement line outside of a series")]
    MeasurementOutsideSeries,
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid time: {0}")]
    InvalidTime(String),
    #[error("Error parsing RA: {0}")]
    InvalidRA(String),
    #[error("Invalid Dec value: {0}")]
    InvalidDec(String),
    #[error("Invalid magnitude: {0}")]
    InvalidMagnitude(String),
}

/// Parse one measurement line (already split into its five fields).
fn parse_measurement(fields: &[&str]) -> Result<Measurement, ParseResError> {
    let (year, month, day) = parse_packed_date(fields[0])
        .ok_or_else(|| ParseResError::InvalidDate(fields[0].to_string()))?;
    let (hour, minute, second, nanos) = parse_packed_time(fields[1])
        .ok_or_else(|| ParseResError::InvalidTime(fields[1].to_string()))?;

    let epoch = Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos)
        .map_err(|_| ParseResError::InvalidDate(fields[0].to_string()))?;

    let ra = parse_packed_ra(fields[2]).ok_or_else(|| ParseResError::InvalidRA(fields[2].to_string()))?;
    let dec =
        parse_packed_dec(fields[3]).ok_or_else(|| ParseResError::InvalidDec(fields[3].to_string()))?;
    let centimag: i32 = fields[4]
        .parse()
        .map_err(|_| ParseResError::InvalidMagnitude(fields[4].to_string()))?;
    let mag = (centimag != 0).then(|| centimag as f64 / 100.0);

    Ok(Measurement::new(epoch, ra, dec, mag))
}

/// Parse the content of a `.res` file.
///
/// Arguments
/// -----------------
/// * `content`: the whole file content
///
/// Return
/// ----------
/// * A [`TargetSet`] keyed by `(station id, series id)`, or
///   [`GeoCheckError::ParsingResFileError`] carrying the 1-based line number of the first
///   offending line. Series repeated in the file are merged; a repeated epoch keeps the last
///   measurement.
pub fn parse_res(content: &str) -> Result<TargetSet, GeoCheckError> {
    let mut targets = TargetSet::new();
    let mut current: Option<TargetTag> = None;

    for (lineno, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let err = |source| GeoCheckError::ParsingResFileError {
            line: lineno + 1,
            source,
        };

        match fields.len() {
            0 => current = None,
            3 => {
                let tag = TargetTag::new(
                    TagField::from(fields[1].to_string()),
                    TagField::from(fields[2].to_string()),
                );
                debug!(target_tag = %tag, line = lineno + 1, "series header");
                targets.entry(tag.clone()).or_insert_with(Measurements::new);
                current = Some(tag);
            }
            5 => {
                let tag = current
                    .as_ref()
                    .ok_or_else(|| err(ParseResError::MeasurementOutsideSeries))?;
                let measurement = parse_measurement(&fields).map_err(err)?;
                let series = targets.entry(tag.clone()).or_default();
                if series.insert(measurement.epoch, measurement).is_some() {
                    warn!(target_tag = %tag, line = lineno + 1, "duplicate epoch, keeping last measurement");
                }
            }
            n => return Err(err(ParseResError::UnexpectedFieldCount(n))),
        }
    }

    // headers without measurements do not make a target
    targets.retain(|_, m| !m.is_empty());
    Ok(targets)
}

/// The legacy `.res` series format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResFormat;

impl ReportFormat for ResFormat {
    fn name(&self) -> &str {
        "res"
    }

    fn description(&self) -> &str {
        "legacy station series (.res)"
    }

    fn epoch_precision_ns(&self) -> u32 {
        10_000_000
    }

    fn read(&self, path: &Utf8Path) -> Result<TargetSet, GeoCheckError> {
        let content = std::fs::read_to_string(path)?;
        parse_res(&content)
    }
}
