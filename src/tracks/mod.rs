//! # Track segmentation
//!
//! A target's measurement series is cut into **tracks**: contiguous, duration-bounded runs
//! of measurements, optionally restricted to a single catalog-match identity.
//!
//! Segmentation is the composition of two pure steps:
//!
//! 1. [`partition_by_identity`] groups indices by match identity (or
//!    [`single_partition`] when splitting by match is disabled);
//! 2. [`segment_by_duration`] cuts each partition so that no track spans more than the
//!    configured duration, measured from the first epoch of the open track.
//!
//! [`build_tracks`] wires both steps for a [`TargetSeries`].
//!
//! ## Ordering
//!
//! Partitions come in order of first appearance of their identity, tracks in epoch order
//! within a partition. Tracks of different partitions may therefore interleave in time.

use std::fmt;

use hifitime::{Duration, Epoch, Unit};
use itertools::Itertools;

use crate::catalog::{CatalogMatch, MatchTable};
use crate::constants::{Degree, Hour, MJD};
use crate::observations::TargetSeries;

/// Match identity used to partition a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchIdentity {
    Unmatched,
    Object(String),
}

impl MatchIdentity {
    pub fn of(object: Option<&CatalogMatch>) -> Self {
        match object {
            Some(o) => MatchIdentity::Object(o.id.clone()),
            None => MatchIdentity::Unmatched,
        }
    }
}

impl fmt::Display for MatchIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchIdentity::Unmatched => write!(f, "?"),
            MatchIdentity::Object(id) => write!(f, "{id}"),
        }
    }
}

/// Indices of a series sharing one match identity (`None` when the series is not split).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub identity: Option<MatchIdentity>,
    pub indices: Vec<usize>,
}

/// The whole series as a single partition.
pub fn single_partition(len: usize) -> Vec<Partition> {
    vec![Partition {
        identity: None,
        indices: (0..len).collect(),
    }]
}

/// Group series indices by match identity.
///
/// Arguments
/// -----------------
/// * `identities`: the match identity of each measurement, in epoch order
///
/// Return
/// ----------
/// * One partition per distinct identity, in order of first appearance; indices keep the
///   order of the series.
pub fn partition_by_identity(identities: &[MatchIdentity]) -> Vec<Partition> {
    identities
        .iter()
        .unique()
        .map(|identity| Partition {
            identity: Some(identity.clone()),
            indices: identities.iter().positions(|i| i == identity).collect(),
        })
        .collect()
}

/// Cut a partition into duration-bounded tracks.
///
/// A track is opened at the first epoch and extended while
/// `epoch - track_start <= max_duration`; the first epoch exceeding the bound opens the next
/// track. Every track therefore spans at most `max_duration`, and a single epoch always makes
/// a track of its own.
///
/// Arguments
/// -----------------
/// * `epochs`: the epochs of the whole series
/// * `partition`: indices into `epochs`, in increasing epoch order
/// * `max_duration`: maximum span of a track
///
/// Return
/// ----------
/// * The tracks as lists of indices; their concatenation is `partition`.
pub fn segment_by_duration(
    epochs: &[Epoch],
    partition: &[usize],
    max_duration: Duration,
) -> Vec<Vec<usize>> {
    let mut tracks: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for &i in partition {
        if let Some(&start) = current.first() {
            if epochs[i] - epochs[start] > max_duration {
                tracks.push(std::mem::take(&mut current));
            }
        }
        current.push(i);
    }
    if !current.is_empty() {
        tracks.push(current);
    }
    tracks
}

/// A track: read-only view of a subset of a target's series.
#[derive(Debug, Clone)]
pub struct Track<'a> {
    pub series: &'a TargetSeries,
    pub indices: Vec<usize>,
    pub identity: Option<MatchIdentity>,
}

impl Track<'_> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn epochs(&self) -> Vec<Epoch> {
        self.indices.iter().map(|&i| self.series.epochs[i]).collect()
    }

    pub fn mjd(&self) -> Vec<MJD> {
        self.indices.iter().map(|&i| self.series.mjd[i]).collect()
    }

    pub fn ra(&self) -> Vec<Hour> {
        self.indices.iter().map(|&i| self.series.ra[i]).collect()
    }

    pub fn dec(&self) -> Vec<Degree> {
        self.indices.iter().map(|&i| self.series.dec[i]).collect()
    }

    pub fn mag(&self) -> Vec<Option<f64>> {
        self.indices.iter().map(|&i| self.series.mag[i]).collect()
    }

    /// Elapsed time between the first and the last epoch of the track.
    pub fn span(&self) -> Duration {
        match (self.indices.first(), self.indices.last()) {
            (Some(&a), Some(&b)) => self.series.epochs[b] - self.series.epochs[a],
            _ => Duration::ZERO,
        }
    }
}

/// Segment a target's series into tracks.
///
/// Arguments
/// -----------------
/// * `series`: the target's measurements
/// * `matches`: catalog matches of the run
/// * `max_track_len`: maximum track duration in minutes
/// * `split_by_match`: partition by match identity before cutting by duration
pub fn build_tracks<'a>(
    series: &'a TargetSeries,
    matches: &MatchTable,
    max_track_len: f64,
    split_by_match: bool,
) -> Vec<Track<'a>> {
    let partitions = if split_by_match {
        let identities: Vec<MatchIdentity> = series
            .epochs
            .iter()
            .map(|epoch| MatchIdentity::of(matches.get(&series.tag, epoch)))
            .collect();
        partition_by_identity(&identities)
    } else {
        single_partition(series.len())
    };

    let max_duration = Unit::Minute * max_track_len;
    partitions
        .into_iter()
        .flat_map(|partition| {
            segment_by_duration(&series.epochs, &partition.indices, max_duration)
                .into_iter()
                .map(move |indices| Track {
                    series,
                    indices,
                    identity: partition.identity.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tracks_test {
    use super::*;
    use crate::constants::{Measurements, TargetTag};
    use crate::observations::Measurement;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn epochs_at(minutes: &[f64]) -> Vec<Epoch> {
        let t0 = Epoch::from_gregorian_utc_hms(2014, 5, 12, 20, 0, 0);
        minutes.iter().map(|&m| t0 + Unit::Minute * m).collect()
    }

    fn series_at(minutes: &[f64]) -> TargetSeries {
        let measurements: Measurements = epochs_at(minutes)
            .into_iter()
            .map(|e| (e, Measurement::new(e, 1.0, 0.0, None)))
            .collect();
        TargetSeries::from_measurements(&TargetTag::new(1u32, 1u32), &measurements)
    }

    #[test]
    fn test_segment_exclusive_boundary() {
        let epochs = epochs_at(&[0.0, 100.0, 300.0, 301.0, 500.0, 602.0, 1000.0]);
        let all: Vec<usize> = (0..epochs.len()).collect();
        let tracks = segment_by_duration(&epochs, &all, Unit::Minute * 300.0);
        assert_eq!(tracks, vec![vec![0, 1, 2], vec![3, 4], vec![5], vec![6]]);
    }

    #[test]
    fn test_segment_single_epoch() {
        let epochs = epochs_at(&[0.0]);
        assert_eq!(
            segment_by_duration(&epochs, &[0], Unit::Minute * 300.0),
            vec![vec![0]]
        );
        assert!(segment_by_duration(&epochs, &[], Unit::Minute * 300.0).is_empty());
    }

    #[test]
    fn test_segment_last_epoch_beyond_bound() {
        let epochs = epochs_at(&[0.0, 400.0]);
        assert_eq!(
            segment_by_duration(&epochs, &[0, 1], Unit::Minute * 300.0),
            vec![vec![0], vec![1]]
        );
    }

    #[test]
    fn test_segment_random_properties() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let n = rng.random_range(1..40);
            let mut minutes: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..2000.0)).collect();
            minutes.sort_by(|a, b| a.total_cmp(b));
            minutes.dedup();

            let epochs = epochs_at(&minutes);
            let all: Vec<usize> = (0..epochs.len()).collect();
            let max = Unit::Minute * rng.random_range(1.0..600.0);
            let tracks = segment_by_duration(&epochs, &all, max);

            for track in &tracks {
                assert!(!track.is_empty());
                assert!(epochs[*track.last().unwrap()] - epochs[track[0]] <= max);
            }
            assert_eq!(tracks.concat(), all);
        }
    }

    #[test]
    fn test_partition_by_identity() {
        use MatchIdentity::*;
        let ids = vec![
            Object("A".into()),
            Unmatched,
            Object("A".into()),
            Object("B".into()),
            Unmatched,
        ];
        let partitions = partition_by_identity(&ids);
        assert_eq!(partitions.len(), 3);
        assert_eq!(partitions[0].identity, Some(Object("A".into())));
        assert_eq!(partitions[0].indices, vec![0, 2]);
        assert_eq!(partitions[1].identity, Some(Unmatched));
        assert_eq!(partitions[1].indices, vec![1, 4]);
        assert_eq!(partitions[2].indices, vec![3]);
        assert_eq!(Unmatched.to_string(), "?");
    }

    #[test]
    fn test_build_tracks() {
        let series = series_at(&[0.0, 10.0]);
        let tracks = build_tracks(&series, &MatchTable::new(), 300.0, false);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].len(), 2);
        assert_eq!(tracks[0].span(), Unit::Minute * 10_i64);

        let series = series_at(&[0.0, 400.0]);
        let tracks = build_tracks(&series, &MatchTable::new(), 300.0, true);
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.len() == 1));
        assert_eq!(tracks[0].identity, Some(MatchIdentity::Unmatched));
    }

    #[test]
    fn test_build_tracks_split_by_match() {
        let series = series_at(&[0.0, 5.0, 10.0, 15.0]);
        let mut matches = MatchTable::new();
        let object = CatalogMatch::new("28884", "tle");
        matches.insert(&series.tag, series.epochs[1], object.clone());
        matches.insert(&series.tag, series.epochs[3], object);

        let tracks = build_tracks(&series, &matches, 300.0, true);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].indices, vec![0, 2]);
        assert_eq!(tracks[1].indices, vec![1, 3]);
        assert_eq!(tracks[1].identity, Some(MatchIdentity::Object("28884".into())));

        let tracks = build_tracks(&series, &matches, 300.0, false);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].identity, None);
    }
}
