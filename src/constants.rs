//! # Constants and type definitions for geocheck
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used by the post-processing pipeline.
//!
//! ## Overview
//!
//! - Geophysical constants (Earth ellipsoid, rotation rate, gravitational parameter)
//! - Unit conversions (degrees ↔ radians, hours ↔ radians, radians ↔ arcseconds)
//! - Core type aliases used across the crate
//! - Target identifiers ([`TagField`], [`TargetTag`]) and the measurement containers
//!   ([`Measurements`], [`TargetSet`])

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use hifitime::Epoch;
use itertools::Itertools;

use crate::observations::Measurement;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00)
pub const T2000: f64 = 51544.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Hours → radians
pub const RADH: f64 = DPI / 24.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Radians → arcseconds
pub const RAD2ARC: f64 = 648000.0 / std::f64::consts::PI;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Earth gravitational parameter μ⊕ in km³/s²
pub const MU_EARTH: f64 = 398_600.4418;

/// Ratio of the sidereal rotation rate to the solar day rate
pub const SIDEREAL_RATIO: f64 = 1.002_737_909_34;

/// Earth rotation rate in rad/s
pub const EARTH_ROTATION_RATE: f64 = DPI * SIDEREAL_RATIO / SECONDS_PER_DAY;

/// Orbital period of a geostationary satellite in minutes
pub const GEO_PERIOD_MIN: f64 = 1436.2;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Angle or time in hours
pub type Hour = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Modified Julian Date (days, UTC)
pub type MJD = f64;

// -------------------------------------------------------------------------------------------------
// Identifiers and data containers
// -------------------------------------------------------------------------------------------------

/// One component of a target tag.
///
/// Report formats identify an observed object by a small tuple of fields (station, series,
/// object number...). Each component is either numeric or free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagField {
    /// Numeric identifier (e.g. station id 10092)
    Int(u32),
    /// Textual identifier (e.g. a provisional designation)
    String(String),
}

impl TagField {
    /// Render the field the way the identification ledger keys it:
    /// zero-padded to six digits for numbers, left-justified to six columns for text.
    pub fn ledger_form(&self) -> String {
        match self {
            TagField::Int(n) => format!("{n:06}"),
            TagField::String(s) => format!("{s:<6}"),
        }
    }

    /// Numeric value of the field, if any.
    pub fn as_int(&self) -> Option<u32> {
        match self {
            TagField::Int(n) => Some(*n),
            TagField::String(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagField::Int(n) => write!(f, "{n}"),
            TagField::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u32> for TagField {
    fn from(n: u32) -> Self {
        TagField::Int(n)
    }
}

impl From<&str> for TagField {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| TagField::String(s.to_string()))
    }
}

impl From<String> for TagField {
    fn from(s: String) -> Self {
        match s.parse::<u32>() {
            Ok(n) => TagField::Int(n),
            Err(_) => TagField::String(s),
        }
    }
}

impl FromStr for TagField {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(TagField::Int)
    }
}

/// Identifier of an observed target: the station that produced the measurements and the
/// object (series) designation assigned by that station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetTag {
    pub station: TagField,
    pub object: TagField,
}

impl TargetTag {
    pub fn new(station: impl Into<TagField>, object: impl Into<TagField>) -> Self {
        TargetTag {
            station: station.into(),
            object: object.into(),
        }
    }

    /// Short key used by the identification ledger (at most 15 characters).
    ///
    /// Return
    /// ----------
    /// * The tag fields rendered with [`TagField::ledger_form`] joined by a space, without
    ///   trailing blanks so that the key survives a write and read of the ledger.
    pub fn ledger_key(&self) -> String {
        let key: String = [&self.station, &self.object]
            .iter()
            .map(|f| f.ledger_form())
            .join(" ")
            .chars()
            .take(LEDGER_TAG_WIDTH)
            .collect();
        key.trim_end().to_string()
    }

    /// File stem used for exported orbit records, `<station>_<object>`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.station, self.object)
    }

    /// Sequence number of the legacy orbit record: numeric object id modulo 10⁶, 0 otherwise.
    pub fn sequence_number(&self) -> u32 {
        self.object.as_int().map(|n| n % 1_000_000).unwrap_or(0)
    }
}

impl fmt::Display for TargetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.station, self.object)
    }
}

/// Width of the tag column of the identification ledger.
pub const LEDGER_TAG_WIDTH: usize = 15;

/// Width of the match label stored in the identification ledger.
pub const LEDGER_LABEL_WIDTH: usize = 40;

/// Measurements of one target, ordered by epoch (unique per target).
pub type Measurements = BTreeMap<Epoch, Measurement>;

/// All targets of a report, keyed by tag.
pub type TargetSet = BTreeMap<TargetTag, Measurements>;
