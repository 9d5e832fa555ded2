//! # Catalog identification
//!
//! The catalog collaborator answers two questions:
//!
//! 1. Which catalog object, if any, does a measurement correspond to
//!    ([`CatalogMatcher::match_objects`]);
//! 2. Where is a matched object at a given epoch ([`CatalogMatcher::ephemeris`]).
//!
//! The [`resolve_matches`] step (the "frame resolver") runs the first question once per
//! distinct epoch of the report, across all targets observed at that epoch, and stores the
//! answers in a [`MatchTable`]. Ephemerides are looked up later, per track, by the residual
//! engine.
//!
//! ## Frames & units
//!
//! Ephemeris state vectors are geocentric, in the equatorial frame of date of the
//! [`FrameTransform`](crate::ref_system::FrameTransform) used by the run, in km and km/s.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use hifitime::Epoch;
use nalgebra::Vector3;
use tracing::{debug, info};

use crate::constants::{Degree, TargetSet, TargetTag, LEDGER_LABEL_WIDTH};
use crate::geocheck_errors::GeoCheckError;
use crate::observations::Measurement;

/// Identity of a matched catalog object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogMatch {
    /// Object identifier (e.g. NORAD number)
    pub id: String,
    /// Identifier of the catalog the object comes from
    pub catid: String,
    /// International designator, if known
    pub intl_id: Option<String>,
    /// Common name, if known
    pub name: Option<String>,
}

impl CatalogMatch {
    pub fn new(id: impl Into<String>, catid: impl Into<String>) -> Self {
        CatalogMatch {
            id: id.into(),
            catid: catid.into(),
            intl_id: None,
            name: None,
        }
    }

    pub fn with_intl_id(mut self, intl_id: impl Into<String>) -> Self {
        self.intl_id = Some(intl_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Full display label, `id[/intl_id][ (name)]`.
    pub fn label(&self) -> String {
        let mut label = self.id.clone();
        if let Some(intl_id) = &self.intl_id {
            label.push('/');
            label.push_str(intl_id);
        }
        if let Some(name) = &self.name {
            label.push_str(&format!(" ({name})"));
        }
        label
    }

    /// Label as stored in the identification ledger.
    pub fn ledger_label(&self) -> String {
        self.label().chars().take(LEDGER_LABEL_WIDTH).collect()
    }
}

impl fmt::Display for CatalogMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// State of a catalog object at one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEphemeris {
    /// Geocentric position (km)
    pub position: Vector3<f64>,
    /// Geocentric velocity (km/s)
    pub velocity: Vector3<f64>,
    /// Longitude of the sub-satellite point (degrees)
    pub sublon: Degree,
}

/// Catalog identification collaborator.
pub trait CatalogMatcher {
    /// Identify the measurements taken at `epoch`.
    ///
    /// Return
    /// ----------
    /// * One entry per input measurement, in the same order: the matched object or `None`.
    fn match_objects(&self, epoch: Epoch, measurements: &[&Measurement]) -> Vec<Option<CatalogMatch>>;

    /// Ephemeris of a matched object at `epoch`.
    fn ephemeris(&self, object: &CatalogMatch, epoch: Epoch)
        -> Result<CatalogEphemeris, GeoCheckError>;
}

/// Matcher used when no identification catalog is configured: nothing is ever matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCatalog;

impl CatalogMatcher for NoCatalog {
    fn match_objects(&self, _epoch: Epoch, measurements: &[&Measurement]) -> Vec<Option<CatalogMatch>> {
        vec![None; measurements.len()]
    }

    fn ephemeris(&self, object: &CatalogMatch, _epoch: Epoch) -> Result<CatalogEphemeris, GeoCheckError> {
        Err(GeoCheckError::EphemerisUnavailable(object.label()))
    }
}

/// Catalog matches of a run, per target and epoch. Unmatched epochs are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchTable {
    matches: BTreeMap<TargetTag, BTreeMap<Epoch, CatalogMatch>>,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: &TargetTag, epoch: Epoch, object: CatalogMatch) {
        self.matches
            .entry(tag.clone())
            .or_default()
            .insert(epoch, object);
    }

    pub fn get(&self, tag: &TargetTag, epoch: &Epoch) -> Option<&CatalogMatch> {
        self.matches.get(tag).and_then(|m| m.get(epoch))
    }

    /// Number of matched (target, epoch) pairs.
    pub fn len(&self) -> usize {
        self.matches.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identify every measurement of the report.
///
/// Epochs are visited in increasing order; all targets observed at an epoch are matched in
/// a single [`CatalogMatcher::match_objects`] call so the matcher can resolve them jointly.
pub fn resolve_matches(targets: &TargetSet, matcher: &dyn CatalogMatcher) -> MatchTable {
    let epochs: BTreeSet<Epoch> = targets.values().flat_map(|m| m.keys().copied()).collect();
    let mut table = MatchTable::new();

    for epoch in epochs {
        let (tags, measurements): (Vec<&TargetTag>, Vec<&Measurement>) = targets
            .iter()
            .filter_map(|(tag, m)| m.get(&epoch).map(|meas| (tag, meas)))
            .unzip();

        let matched = matcher.match_objects(epoch, &measurements);
        let mut identified = 0;
        for (tag, object) in tags.into_iter().zip(matched) {
            if let Some(object) = object {
                table.insert(tag, epoch, object);
                identified += 1;
            }
        }
        debug!(%epoch, measurements = measurements.len(), identified, "catalog matching");
    }

    info!(identified = table.len(), "catalog matching done");
    table
}

#[cfg(test)]
mod catalog_test {
    use super::*;
    use crate::constants::Measurements;

    struct EveryOther;

    impl CatalogMatcher for EveryOther {
        fn match_objects(&self, _epoch: Epoch, measurements: &[&Measurement]) -> Vec<Option<CatalogMatch>> {
            measurements
                .iter()
                .map(|m| (m.ra < 3.0).then(|| CatalogMatch::new("28884", "tle")))
                .collect()
        }

        fn ephemeris(&self, object: &CatalogMatch, _epoch: Epoch) -> Result<CatalogEphemeris, GeoCheckError> {
            Err(GeoCheckError::EphemerisUnavailable(object.label()))
        }
    }

    #[test]
    fn test_label() {
        let object = CatalogMatch::new("28884", "tle");
        assert_eq!(object.label(), "28884");

        let object = object.with_intl_id("2005-041A").with_name("GALAXY 15");
        assert_eq!(object.label(), "28884/2005-041A (GALAXY 15)");
        assert_eq!(object.to_string(), object.label());

        let long = CatalogMatch::new("1", "tle").with_name("A VERY LONG SATELLITE NAME THAT OVERFLOWS");
        assert_eq!(long.ledger_label().chars().count(), LEDGER_LABEL_WIDTH);
    }

    #[test]
    fn test_resolve_matches() {
        let e1 = Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 0, 0);
        let e2 = Epoch::from_gregorian_utc_hms(2014, 5, 12, 21, 5, 0);
        let tag_a = TargetTag::new(1u32, 1u32);
        let tag_b = TargetTag::new(1u32, 2u32);

        let mut targets = TargetSet::new();
        let mut a = Measurements::new();
        a.insert(e1, Measurement::new(e1, 1.0, 0.0, None));
        a.insert(e2, Measurement::new(e2, 5.0, 0.0, None));
        let mut b = Measurements::new();
        b.insert(e1, Measurement::new(e1, 2.0, 0.0, None));
        targets.insert(tag_a.clone(), a);
        targets.insert(tag_b.clone(), b);

        let table = resolve_matches(&targets, &EveryOther);
        assert_eq!(table.len(), 2);
        assert!(table.get(&tag_a, &e1).is_some());
        assert!(table.get(&tag_a, &e2).is_none());
        assert!(table.get(&tag_b, &e1).is_some());

        assert!(resolve_matches(&targets, &NoCatalog).is_empty());
    }
}
