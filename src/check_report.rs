//! # Check report
//!
//! Human-readable `<input>.check` file. For every target:
//!
//! ```text
//! -- Target: (10092, 95232) -------------------------------------------------------------------
//!
//! WARNING. Measurements possibly contain multiple objects        (more than one track)
//!
//!
//!                MJD - 56789      RA          HA          Dec       mag      Int. residuals ["]          Ext. residuals ["]    Match
//!                              h           h            d                  Tangent     Normal     Tangent.   Normal
//!  0.88802083  05.8950472  13.2104553  -06.209600  12.45  +00000.12   -00000.40   +00001.05  -00000.33  28884/2005-041A (GALAXY 15)
//! ...
//! Median:                                                  +0.12       -0.40       +1.05      -0.33
//! RMS:                                                      0.05        0.07        0.10       0.06
//! Osculating elements for epoch 2014-05-12T21:18:47 UTC:
//!   a     42164.170 km (IOD)
//!         42165.002 km (28884)
//! ...
//! Longitude of sub-satellite point: 15.1
//! ```
//!
//! Each section is a [`fmt::Display`] value so the pipeline can stream it to the output file.
//! The element dump is read back by [`crate::reference_elements`].

use std::collections::BTreeMap;
use std::fmt;

use hifitime::Epoch;
use tracing::warn;

use crate::catalog::{CatalogMatch, CatalogMatcher};
use crate::constants::TargetTag;
use crate::orbit_type::keplerian_element::KeplerianElements;
use crate::residuals::TrackResiduals;
use crate::statistics::{SeriesSummary, TrackSummary};

/// Image file names keyed by (rounded) measurement epoch.
pub type FrameNames = BTreeMap<Epoch, String>;

/// Width of the target separator line.
const TARGET_RULE_WIDTH: usize = 150;

/// Target separator, followed by the multiple-objects warning when the target has more than
/// one track.
pub struct TargetHeader<'a> {
    pub tag: &'a TargetTag,
    pub tracks: usize,
}

impl fmt::Display for TargetHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("-- Target: {} ", self.tag);
        write!(f, "{title:-<width$}", width = TARGET_RULE_WIDTH)?;
        if self.tracks > 1 {
            write!(f, "\n\nWARNING. Measurements possibly contain multiple objects")?;
        }
        Ok(())
    }
}

/// Residual table of one track with its totals.
pub struct TrackTable<'a> {
    pub result: &'a TrackResiduals<'a>,
    pub summary: &'a TrackSummary,
    pub frames: Option<&'a FrameNames>,
}

impl TrackTable<'_> {
    fn frame_names(&self) -> Vec<&str> {
        self.result
            .records
            .iter()
            .map(|r| {
                self.frames
                    .and_then(|frames| frames.get(&r.epoch))
                    .map(String::as_str)
                    .unwrap_or("")
            })
            .collect()
    }
}

fn signed(value: Option<f64>) -> String {
    value.map(|v| format!("{v:+9.2}")).unwrap_or_default()
}

fn unsigned(value: Option<f64>) -> String {
    value.map(|v| format!("{v:9.2}")).unwrap_or_default()
}

fn residual(value: Option<f64>) -> String {
    value.map(|v| format!("{v:+09.2}")).unwrap_or_default()
}

impl fmt::Display for TrackTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let series = self.result.track.series;
        let names = self.frame_names();
        let fw = match names.iter().map(|n| n.len()).max().unwrap_or(0) {
            0 => 0,
            w => w + 2,
        };
        let frame_title = if fw > 0 {
            format!("{:^w$}", "Frame", w = fw - 2)
        } else {
            String::new()
        };

        writeln!(f, "\n")?;
        writeln!(
            f,
            "{:<fw$}{:>11}  {:^10}  {:^10}  {:^10}  {:^5}  {:^22}  {:>42}  Match",
            frame_title,
            format!("MJD - {:5}", series.mjd0() as i64),
            "RA",
            "HA",
            "Dec",
            "mag",
            "Int. residuals [\"]",
            format!("{:^18}", "Ext. residuals [\"]"),
        )?;
        writeln!(
            f,
            "{:<fw$}{:>11}  {:<10}  {:<10}  {:<10}  {:>5}  {:^10}  {:^10}  {:^9}  {:^9}",
            "", "", "  h", "  h", "   d", "", "Tangent", "Normal", "Tangent.", "Normal",
        )?;

        let mjd0 = series.mjd0();
        for ((record, &i), name) in self
            .result
            .records
            .iter()
            .zip(&self.result.track.indices)
            .zip(&names)
        {
            let mag = record.mag.map(|m| format!("{m:5.2}")).unwrap_or_default();
            let internal = record.internal;
            let tan_flag = if internal.is_some_and(|r| r.tan_outlier) { '*' } else { ' ' };
            let norm_flag = if internal.is_some_and(|r| r.norm_outlier) { '*' } else { ' ' };

            writeln!(
                f,
                "{:<fw$}{:11.8}  {:010.7}  {:010.7}  {:+010.6}  {:>5}  {:>9}{}  {:>9}{}  {:>9}  {:>9}  {}",
                name,
                record.mjd - mjd0,
                series.ra[i],
                record.ha,
                series.dec[i],
                mag,
                residual(internal.map(|r| r.tan)),
                tan_flag,
                residual(internal.map(|r| r.norm)),
                norm_flag,
                residual(record.external_tan()),
                residual(record.external_norm()),
                record.match_label(),
            )?;
        }

        let s = self.summary;
        let center = |x: Option<SeriesSummary>| signed(x.map(|x| x.median));
        let spread = |x: Option<SeriesSummary>| unsigned(x.map(|x| x.rms));
        write!(
            f,
            "Median:{}{:>9}   {:>9}   {:>9}  {:>9}",
            " ".repeat(49 + fw),
            center(s.internal_tan),
            center(s.internal_norm),
            center(s.external_tan),
            center(s.external_norm),
        )?;
        if s.has_residuals() {
            write!(
                f,
                "\nRMS:{}{:>9}   {:>9}   {:>9}  {:>9}",
                " ".repeat(52 + fw),
                spread(s.internal_tan),
                spread(s.internal_norm),
                spread(s.external_tan),
                spread(s.external_norm),
            )?;
        }
        if s.uncorrelated {
            write!(f, "\n\nWARNING. The object is uncorrelated")?;
        }
        Ok(())
    }
}

/// One osculating element as printed in the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    SemiMajorAxis,
    Eccentricity,
    Inclination,
    Node,
    Periapsis,
    MeanAnomaly,
}

impl Element {
    pub const ALL: [Element; 6] = [
        Element::SemiMajorAxis,
        Element::Eccentricity,
        Element::Inclination,
        Element::Node,
        Element::Periapsis,
        Element::MeanAnomaly,
    ];

    /// Label, value and unit of the element of an orbit; near-parabolic orbits show the
    /// semi-latus rectum `p` instead of `a`.
    fn render(&self, orbit: &KeplerianElements) -> (&'static str, String) {
        match self {
            Element::SemiMajorAxis if (orbit.eccentricity - 1.0).abs() < 1e-8 => {
                let p = orbit.semi_major_axis * (1.0 - orbit.eccentricity.powi(2));
                ("p", format!("{p:12.3} km"))
            }
            Element::SemiMajorAxis => ("a", format!("{:12.3} km", orbit.semi_major_axis)),
            Element::Eccentricity => ("e", format!("{:12.7}", orbit.eccentricity)),
            Element::Inclination => ("i", format!("{:12.4} deg", orbit.inclination)),
            Element::Node => ("W", format!("{:12.4} deg", orbit.ascending_node_longitude)),
            Element::Periapsis => ("w", format!("{:12.4} deg", orbit.periapsis_argument)),
            Element::MeanAnomaly => ("M", format!("{:12.4} deg", orbit.mean_anomaly)),
        }
    }
}

/// Osculating elements of the catalog objects matched in a track, at `epoch`.
///
/// Objects whose ephemeris or element conversion fails are left out with a warning.
pub fn matched_elements(
    result: &TrackResiduals,
    matcher: &dyn CatalogMatcher,
    epoch: Epoch,
) -> Vec<(CatalogMatch, KeplerianElements)> {
    let mut objects: Vec<&CatalogMatch> = result.matched_objects();
    objects.sort_by(|a, b| (&a.id, &a.catid).cmp(&(&b.id, &b.catid)));
    objects.dedup_by(|a, b| a.id == b.id && a.catid == b.catid);

    objects
        .into_iter()
        .filter_map(|object| {
            let elements = matcher.ephemeris(object, epoch).and_then(|eph| {
                KeplerianElements::from_state(&eph.position, &eph.velocity, epoch)
            });
            match elements {
                Ok(elements) => Some((object.clone(), elements)),
                Err(e) => {
                    warn!(object = %object, %epoch, "no osculating elements: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Epoch of the element dump: the fit epoch, or the middle of the track without a fit.
pub fn dump_epoch(result: &TrackResiduals) -> Option<Epoch> {
    if let Some(fit) = result.orbit_fit() {
        return Some(fit.orbit.reference_epoch);
    }
    let first = result.records.first()?.epoch;
    let last = result.records.last()?.epoch;
    Some(first + (last - first) * 0.5)
}

/// Element dump of one track.
pub struct ElementDump<'a> {
    pub fitted: Option<&'a KeplerianElements>,
    pub matched: &'a [(CatalogMatch, KeplerianElements)],
    pub sublon: Option<f64>,
}

impl fmt::Display for ElementDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = Vec::new();
        match self.fitted {
            Some(orbit) => lines.push(format!(
                "Osculating elements for epoch {}:",
                orbit.reference_epoch
            )),
            None if !self.matched.is_empty() => {
                lines.push("Osculating elements of catalog object(s)".to_string())
            }
            None => {}
        }

        for element in Element::ALL {
            if let Some(orbit) = self.fitted {
                let (label, value) = element.render(orbit);
                let iod = if self.matched.is_empty() { "" } else { " (IOD)" };
                lines.push(format!("  {label:<3}{value}{iod}"));
            }
            for (k, (object, orbit)) in self.matched.iter().enumerate() {
                let (label, value) = element.render(orbit);
                let label = if self.fitted.is_none() && k == 0 { label } else { "" };
                lines.push(format!("  {label:<3}{value} ({})", object.id));
            }
        }

        if let Some(sublon) = self.sublon {
            lines.push(format!("Longitude of sub-satellite point: {sublon:.1}"));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod check_report_test {
    use super::*;
    use crate::catalog::MatchTable;
    use crate::constants::{Measurements, TargetTag};
    use crate::geocheck_errors::ResidualAbsence;
    use crate::observations::{Measurement, TargetSeries};
    use crate::residuals::{InternalResidual, ResidualRecord};
    use crate::tracks::build_tracks;
    use crate::geocheck_errors::GeoCheckError;
    use hifitime::Unit;

    fn series() -> TargetSeries {
        let t0 = Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 0, 0);
        let measurements: Measurements = (0..2)
            .map(|k| {
                let e = t0 + Unit::Minute * (10 * k) as i64;
                (e, Measurement::new(e, 5.5 + 0.01 * k as f64, -6.2, Some(12.45)))
            })
            .collect();
        TargetSeries::from_measurements(&TargetTag::new(10092u32, 95232u32), &measurements)
    }

    fn orbit(epoch: Epoch) -> KeplerianElements {
        KeplerianElements {
            reference_epoch: epoch,
            semi_major_axis: 42_164.17,
            eccentricity: 0.000_25,
            inclination: 0.05,
            ascending_node_longitude: 87.5,
            periapsis_argument: 12.25,
            mean_anomaly: 300.0,
        }
    }

    fn result(series: &TargetSeries) -> TrackResiduals<'_> {
        let track = build_tracks(series, &MatchTable::new(), 300.0, false).remove(0);
        let records = series
            .epochs
            .iter()
            .enumerate()
            .map(|(i, &epoch)| ResidualRecord {
                epoch,
                mjd: series.mjd[i],
                ra: series.ra[i],
                dec: series.dec[i],
                ha: 13.25,
                mag: series.mag[i],
                internal: Some(InternalResidual {
                    tan: 0.12,
                    norm: -0.4,
                    tan_outlier: i == 1,
                    norm_outlier: false,
                }),
                external: if i == 0 {
                    Ok((1.05, -0.33))
                } else {
                    Err(ResidualAbsence::NoMatch)
                },
                object: (i == 0).then(|| CatalogMatch::new("28884", "tle")),
                sublon: None,
            })
            .collect();
        TrackResiduals {
            track,
            fit: Err(GeoCheckError::OrbitFitFailed("test".into())),
            records,
        }
    }

    #[test]
    fn test_target_header() {
        let tag = TargetTag::new(10092u32, 95232u32);
        let one = TargetHeader { tag: &tag, tracks: 1 }.to_string();
        assert_eq!(one.len(), 150);
        assert!(one.starts_with("-- Target: (10092, 95232) ---"));

        let two = TargetHeader { tag: &tag, tracks: 2 }.to_string();
        assert!(two.ends_with("\n\nWARNING. Measurements possibly contain multiple objects"));
    }

    #[test]
    fn test_track_table_rows() {
        let series = series();
        let result = result(&series);
        let summary = TrackSummary::from_residuals(&result);
        let text = TrackTable {
            result: &result,
            summary: &summary,
            frames: None,
        }
        .to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[2].contains("MJD - 56789"));
        assert!(lines[2].ends_with("Match"));
        assert!(lines[4].starts_with(" 0.87500000  05.5000000  13.2500000  -06.200000  12.45  +00000.12   -00000.40   +00001.05  -00000.33  28884"));
        assert!(lines[5].contains("+00000.12*"));
        assert!(lines[6].starts_with("Median:"));
        assert!(lines[7].starts_with("RMS:"));
        assert_eq!(lines.len(), 8);
        assert!(!summary.uncorrelated);
    }

    #[test]
    fn test_track_table_frames_and_uncorrelated() {
        let series = series();
        let mut result = result(&series);
        for record in &mut result.records {
            record.external = Err(ResidualAbsence::NoMatch);
            record.object = None;
        }
        let summary = TrackSummary::from_residuals(&result);
        let frames: FrameNames = [(series.epochs[0], "img_0001.fits".to_string())].into();

        let text = TrackTable {
            result: &result,
            summary: &summary,
            frames: Some(&frames),
        }
        .to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].starts_with("    Frame    "));
        assert!(lines[4].starts_with("img_0001.fits   0.87500000"));
        assert!(lines[5].starts_with(&" ".repeat(15)));
        assert!(text.ends_with("WARNING. The object is uncorrelated"));
    }

    #[test]
    fn test_element_dump() {
        let epoch = Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 5, 0);
        let fitted = orbit(epoch);
        let matched = vec![(CatalogMatch::new("28884", "tle"), orbit(epoch))];

        let text = ElementDump {
            fitted: Some(&fitted),
            matched: &matched,
            sublon: Some(15.06),
        }
        .to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Osculating elements for epoch "));
        assert_eq!(lines[1], "  a     42164.170 km (IOD)");
        assert_eq!(lines[2], "        42164.170 km (28884)");
        assert_eq!(lines[3], "  e     0.0002500 (IOD)");
        assert_eq!(lines[5], "  i        0.0500 deg (IOD)");
        assert_eq!(lines[13], "Longitude of sub-satellite point: 15.1");

        let text = ElementDump {
            fitted: None,
            matched: &matched,
            sublon: None,
        }
        .to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Osculating elements of catalog object(s)");
        assert_eq!(lines[1], "  a     42164.170 km (28884)");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_dump_epoch_mid_track() {
        let series = series();
        let result = result(&series);
        assert_eq!(
            dump_epoch(&result),
            Some(series.epochs[0] + Unit::Minute * 5_i64)
        );
    }
}
