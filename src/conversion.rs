use crate::constants::{Degree, Hour};

/// Split a packed `XXmmsscc` sexagesimal field into its integer groups.
///
/// Arguments
/// ---------------
/// * `field`: digits only, the leading group of `lead` characters followed by two digits of
///   minutes and four digits of centiseconds
/// * `lead`: width of the leading group (hours or degrees)
///
/// Return
/// ----------
/// * `Option<(u32, u32, u32)>`: `(lead, minutes, centiseconds)`, or `None` if the field is
///   malformed or out of range
fn split_packed(field: &str, lead: usize) -> Option<(u32, u32, u32)> {
    if field.len() != lead + 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let head: u32 = field[..lead].parse().ok()?;
    let minutes: u32 = field[lead..lead + 2].parse().ok()?;
    let centisec: u32 = field[lead + 2..].parse().ok()?;

    if minutes >= 60 || centisec >= 6000 {
        return None;
    }
    Some((head, minutes, centisec))
}

/// Parse a packed `yyyymmdd` calendar date.
///
/// Return
/// ----------
/// * `Option<(i32, u8, u8)>`: `(year, month, day)`; `None` when malformed or out of range
pub fn parse_packed_date(date: &str) -> Option<(i32, u8, u8)> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = date[..4].parse().ok()?;
    let month: u8 = date[4..6].parse().ok()?;
    let day: u8 = date[6..].parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((year, month, day))
}

/// Parse a packed `hhmmsscc` time of day.
///
/// Return
/// ----------
/// * `Option<(u8, u8, u8, u32)>`: `(hour, minute, second, nanoseconds)`
pub fn parse_packed_time(time: &str) -> Option<(u8, u8, u8, u32)> {
    let (h, m, cs) = split_packed(time, 2)?;
    if h >= 24 {
        return None;
    }
    Some((h as u8, m as u8, (cs / 100) as u8, (cs % 100) * 10_000_000))
}

/// Parse a packed right ascension `hhmmsscc` to decimal hours.
///
/// Arguments
/// ---------
/// * `ra`: hours, minutes and centiseconds of time, e.g. `"05354217"` for 05h35m42.17s
///
/// Returns
/// -------
/// * `Option<Hour>`: right ascension in hours, `None` if the input format is invalid
pub fn parse_packed_ra(ra: &str) -> Option<Hour> {
    let (h, m, cs) = split_packed(ra, 2)?;
    if h >= 24 {
        return None;
    }
    Some(h as f64 + m as f64 / 60.0 + cs as f64 / 100.0 / 3600.0)
}

/// Parse a packed declination `±ddmmsscc` to decimal degrees.
///
/// The sign is carried by the degree group, so `-00301420` is -0°30'14.20".
/// A field without a sign character is read as positive.
///
/// Returns
/// -------
/// * `Option<Degree>`: declination in degrees, `None` if the input format is invalid
pub fn parse_packed_dec(dec: &str) -> Option<Degree> {
    let (sign, digits) = match dec.as_bytes().first()? {
        b'-' => (-1.0, &dec[1..]),
        b'+' => (1.0, &dec[1..]),
        _ => (1.0, dec),
    };

    let (d, m, cs) = split_packed(digits, 2)?;
    if d > 90 {
        return None;
    }
    Some(sign * (d as f64 + m as f64 / 60.0 + cs as f64 / 100.0 / 3600.0))
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_packed_date() {
        assert_eq!(parse_packed_date("20140512"), Some((2014, 5, 12)));
        assert_eq!(parse_packed_date("20141312"), None);
        assert_eq!(parse_packed_date("2014051"), None);
        assert_eq!(parse_packed_date("2014O512"), None);
    }

    #[test]
    fn test_parse_packed_time() {
        assert_eq!(parse_packed_time("21304517"), Some((21, 30, 45, 170_000_000)));
        assert_eq!(parse_packed_time("00000000"), Some((0, 0, 0, 0)));
        assert_eq!(parse_packed_time("25000000"), None);
        assert_eq!(parse_packed_time("21614517"), None);
    }

    #[test]
    fn test_parse_packed_ra() {
        assert_relative_eq!(
            parse_packed_ra("05354217").unwrap(),
            5.0 + 35.0 / 60.0 + 42.17 / 3600.0,
            epsilon = 1e-12
        );
        assert_eq!(parse_packed_ra("0535421"), None);
    }

    #[test]
    fn test_parse_packed_dec() {
        assert_relative_eq!(
            parse_packed_dec("-00301420").unwrap(),
            -0.5039444444444444,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            parse_packed_dec("+13554270").unwrap(),
            13.928527777777777,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            parse_packed_dec("13554270").unwrap(),
            13.928527777777777,
            epsilon = 1e-12
        );
        assert_eq!(parse_packed_dec("+9a554270"), None);
        assert_eq!(parse_packed_dec(""), None);
    }
}
