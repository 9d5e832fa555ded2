//! # Track statistics
//!
//! Robust summaries of the four residual series of a track and the wrap-aware median of the
//! sub-satellite longitudes.
//!
//! Absent values are dropped before any statistic is computed; a series with no value left
//! has no summary.

use itertools::Itertools;

use crate::constants::{ArcSec, Degree};
use crate::residuals::TrackResiduals;

/// Median of a list of values, the mean of the two central values for an even count.
///
/// Return
/// ----------
/// * `None` for an empty list.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted: Vec<f64> = values.iter().copied().sorted_by(|a, b| a.total_cmp(b)).collect();
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2]))
    }
}

/// Root mean square of the deviations of `values` from `center`.
pub fn rms_about(values: &[f64], center: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    Some((sum / values.len() as f64).sqrt())
}

/// Median of longitudes, robust to the 0°/360° seam.
///
/// When the values straddle the seam (some below 90°, some above 270°), values above 180°
/// are shifted by −360° before taking the median. The result lies in [0°, 360°).
pub fn median_longitude(values: &[Degree]) -> Option<Degree> {
    let straddles = values.iter().any(|&v| v < 90.0) && values.iter().any(|&v| v > 270.0);
    let unwrapped: Vec<Degree> = if straddles {
        values
            .iter()
            .map(|&v| if v > 180.0 { v - 360.0 } else { v })
            .collect()
    } else {
        values.to_vec()
    };
    median(&unwrapped).map(|m| m.rem_euclid(360.0))
}

/// Center and spread of one residual series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub median: ArcSec,
    pub rms: ArcSec,
}

impl SeriesSummary {
    /// Summarize the present values of a series.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let present: Vec<f64> = values.into_iter().flatten().collect();
        let median = median(&present)?;
        let rms = rms_about(&present, median)?;
        Some(SeriesSummary { median, rms })
    }
}

/// Summary of a processed track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub internal_tan: Option<SeriesSummary>,
    pub internal_norm: Option<SeriesSummary>,
    pub external_tan: Option<SeriesSummary>,
    pub external_norm: Option<SeriesSummary>,
    /// Median sub-satellite longitude of the matches (degrees)
    pub sublon: Option<Degree>,
    /// No epoch of the track has a match label
    pub uncorrelated: bool,
}

impl TrackSummary {
    pub fn from_residuals(result: &TrackResiduals) -> Self {
        let records = &result.records;
        TrackSummary {
            internal_tan: SeriesSummary::from_values(records.iter().map(|r| r.internal_tan())),
            internal_norm: SeriesSummary::from_values(records.iter().map(|r| r.internal_norm())),
            external_tan: SeriesSummary::from_values(records.iter().map(|r| r.external_tan())),
            external_norm: SeriesSummary::from_values(records.iter().map(|r| r.external_norm())),
            sublon: median_longitude(&result.sublons()),
            uncorrelated: result.is_uncorrelated(),
        }
    }

    /// `true` when at least one of the four residual series has a summary.
    pub fn has_residuals(&self) -> bool {
        [
            self.internal_tan,
            self.internal_norm,
            self.external_tan,
            self.external_norm,
        ]
        .iter()
        .any(Option::is_some)
    }
}

#[cfg(test)]
mod statistics_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_rms_about() {
        assert_eq!(rms_about(&[], 0.0), None);
        assert_eq!(rms_about(&[2.0], 2.0), Some(0.0));
        assert_relative_eq!(rms_about(&[1.0, 3.0], 2.0).unwrap(), 1.0);
    }

    #[test]
    fn test_series_summary_absent_values() {
        assert_eq!(SeriesSummary::from_values(vec![None, None]), None);
        assert_eq!(
            SeriesSummary::from_values(vec![None, Some(1.5), None]),
            Some(SeriesSummary {
                median: 1.5,
                rms: 0.0
            })
        );

        let summary = SeriesSummary::from_values(vec![Some(-1.0), None, Some(0.0), Some(4.0)]).unwrap();
        assert_eq!(summary.median, 0.0);
        assert_relative_eq!(summary.rms, (17.0_f64 / 3.0).sqrt());
    }

    #[test]
    fn test_median_longitude_wrap() {
        assert_relative_eq!(median_longitude(&[5.0, 355.0]).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(median_longitude(&[350.0, 352.0, 10.0]).unwrap(), 352.0);
        assert_relative_eq!(median_longitude(&[100.0, 120.0]).unwrap(), 110.0);
        assert_relative_eq!(median_longitude(&[200.0, 300.0]).unwrap(), 250.0);
        assert_eq!(median_longitude(&[]), None);
    }
}
