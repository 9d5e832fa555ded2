//! # Time scales and calendar helpers
//!
//! Sidereal time, MJD conversions and the "observing night" calendar used to bucket
//! identification ledger entries.
//!
//! All epochs handled by the pipeline are UTC [`hifitime::Epoch`] values. Sidereal time is
//! computed from the UTC MJD, UT1−UTC being below the precision of the check report.

use std::fmt;
use std::str::FromStr;

use hifitime::{Epoch, Unit};

use crate::constants::{Degree, Hour, DPI, MJD, SECONDS_PER_DAY, SIDEREAL_RATIO, T2000};
use crate::geocheck_errors::GeoCheckError;

/// Modified Julian Date (UTC) of an epoch.
pub fn mjd_utc(epoch: &Epoch) -> MJD {
    epoch.to_mjd_utc_days()
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date.
///
/// This function implements the IAU 1982 polynomial formula
/// for the mean sidereal time at 0h UT1, plus the fractional-day
/// correction term due to Earth's rotation rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # References
/// * IAU 1982, IERS Conventions 1996.
/// * Explanatory Supplement to the Astronomical Almanac (1992).
pub fn gmst(tjm: MJD) -> f64 {
    // GMST at 0h UT1, in seconds
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / 36525.0;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / SECONDS_PER_DAY;

    // rotation accumulated since 0h, in sidereal units
    let h = (tjm - itjm) * DPI;
    (gmst0 + h * SIDEREAL_RATIO).rem_euclid(DPI)
}

/// Local mean sidereal time in hours, in [0, 24).
///
/// Arguments
/// -----------------
/// * `tjm`: Modified Julian Date (UTC)
/// * `longitude`: east longitude of the site in degrees
pub fn local_sidereal_time(tjm: MJD, longitude: Degree) -> Hour {
    (gmst(tjm) * 24.0 / DPI + longitude / 15.0).rem_euclid(24.0)
}

/// Round an epoch to the nearest multiple of `nanos` nanoseconds (UTC).
pub fn round_epoch(epoch: Epoch, nanos: u32) -> Epoch {
    if nanos <= 1 {
        return epoch;
    }
    let (.., ns) = epoch.to_gregorian_utc();
    let step = nanos as i64;
    let rem = ns as i64 % step;
    if 2 * rem >= step {
        epoch + Unit::Nanosecond * (step - rem)
    } else {
        epoch - Unit::Nanosecond * rem
    }
}

/// Calendar fields of an epoch rounded to the millisecond:
/// `(year, month, day, hour, minute, second, millisecond)`.
pub fn gregorian_millis(epoch: Epoch) -> (i32, u8, u8, u8, u8, u8, u32) {
    let (y, mo, d, h, mi, s, ns) = round_epoch(epoch, 1_000_000).to_gregorian_utc();
    (y, mo, d, h, mi, s, ns / 1_000_000)
}

/// Calendar date of an observing night.
///
/// A night is named after the calendar date on which it begins: measurements taken before
/// 12:00 UTC belong to the previous day's night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NightDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl NightDate {
    /// Build a night date, validating the calendar fields.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, GeoCheckError> {
        Epoch::maybe_from_gregorian_utc(year, month, day, 0, 0, 0, 0).map_err(|e| {
            GeoCheckError::LedgerParse(format!("invalid date {year}-{month}-{day}: {e}"))
        })?;
        Ok(NightDate { year, month, day })
    }

    /// Night an epoch belongs to.
    pub fn of_epoch(epoch: Epoch) -> Self {
        let (_, _, _, hour, ..) = epoch.to_gregorian_utc();
        let reference = if hour < 12 {
            epoch - Unit::Day * 1_i64
        } else {
            epoch
        };
        let (year, month, day, ..) = reference.to_gregorian_utc();
        NightDate { year, month, day }
    }
}

impl fmt::Display for NightDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for NightDate {
    type Err = GeoCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeoCheckError::LedgerParse(format!("not a date: {s:?}"));

        let mut parts = s.trim().split('-');
        let year = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let month = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let day = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        NightDate::new(year, month, day)
    }
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gmst() {
        let tut = 57028.478514610404;
        assert_relative_eq!(gmst(tut), 4.851925725092499, epsilon = 1e-12);

        assert_relative_eq!(gmst(T2000), 4.894961212789145, epsilon = 1e-12);
    }

    #[test]
    fn test_local_sidereal_time() {
        let lst_greenwich = local_sidereal_time(T2000, 0.0);
        assert_relative_eq!(lst_greenwich, 4.894961212789145 * 24.0 / DPI, epsilon = 1e-10);

        // 90° east is 6 hours ahead
        let lst_east = local_sidereal_time(T2000, 90.0);
        assert_relative_eq!(
            lst_east,
            (lst_greenwich + 6.0).rem_euclid(24.0),
            epsilon = 1e-10
        );
        assert!((0.0..24.0).contains(&local_sidereal_time(T2000, -170.0)));
    }

    #[test]
    fn test_mjd_utc() {
        let epoch = Epoch::from_gregorian_utc_hms(2021, 1, 1, 0, 0, 0);
        assert_eq!(mjd_utc(&epoch), 59215.0);
    }

    #[test]
    fn test_night_date() {
        let evening = Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 30, 0);
        assert_eq!(NightDate::of_epoch(evening), NightDate::new(2014, 5, 12).unwrap());

        let morning = Epoch::from_gregorian_utc_hms(2014, 5, 13, 3, 10, 0);
        assert_eq!(NightDate::of_epoch(morning), NightDate::new(2014, 5, 12).unwrap());

        let new_year = Epoch::from_gregorian_utc_hms(2015, 1, 1, 2, 0, 0);
        assert_eq!(NightDate::of_epoch(new_year).to_string(), "2014-12-31");
    }

    #[test]
    fn test_night_date_parse() {
        let date: NightDate = "2014-05-12".parse().unwrap();
        assert_eq!(date, NightDate::new(2014, 5, 12).unwrap());
        assert_eq!(date.to_string(), "2014-05-12");

        assert!("      Date".parse::<NightDate>().is_err());
        assert!("2014-13-01".parse::<NightDate>().is_err());
        assert!("2014-05-12-1".parse::<NightDate>().is_err());
    }

    #[test]
    fn test_gregorian_millis() {
        let epoch = Epoch::from_gregorian_utc(2014, 5, 12, 21, 30, 45, 123_600_000);
        assert_eq!(gregorian_millis(epoch), (2014, 5, 12, 21, 30, 45, 124));

        let epoch = Epoch::from_gregorian_utc(2014, 5, 12, 21, 30, 59, 999_700_000);
        assert_eq!(gregorian_millis(epoch), (2014, 5, 12, 21, 31, 0, 0));
    }
}
