//! # Identification ledger
//!
//! Cross-run record of catalog identifications, persisted as a flat text table (`ident.txt`).
//! Each observing night and target tag owns one entry: the list of catalog objects the
//! target's measurements were matched to, most frequent first.
//!
//! ## File layout
//!
//! ```text
//!
//!        Date     Measurements   Match ID/designation                     Num /Total Residual [deg]
//!                                                                       matched      tan    norm
//!
//! 2014-05-12 010092 095232   28884/2005-041A (GALAXY 15)                12/14    0.001  -0.002
//!                            ???                                        14
//! ```
//!
//! * a **primary line** starts with the 10-character night date, then the 16-character tag
//!   field (a separator and the tag left-justified to 15 columns), then the match summary;
//! * a **continuation line** is blank up to column 26 and carries one more summary;
//! * any line before the first primary line (the header) is ignored.
//!
//! ## Merge rule
//!
//! A run replaces the whole entry of every `(night, tag)` it processed and leaves every other
//! entry untouched; [`Ledger::merge`] implements it. Entries are written back sorted by
//! `(night, tag)`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;

use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::constants::{LEDGER_LABEL_WIDTH, LEDGER_TAG_WIDTH};
use crate::geocheck_errors::GeoCheckError;
use crate::statistics::median;
use crate::time::NightDate;

/// Width of the date field of a primary line.
const DATE_WIDTH: usize = 10;

/// Column where the match summary starts.
const SUMMARY_COLUMN: usize = DATE_WIDTH + 1 + LEDGER_TAG_WIDTH;

const HEADER: &str = "
       Date     Measurements   Match ID/designation                     Num /Total Residual [deg]
                                                                      matched      tan    norm
    ";

/// One line of a ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchSummary {
    /// Measurements identified with one catalog object
    Matched {
        label: String,
        matched: usize,
        total: usize,
        /// median tangential external residual (degrees)
        tan: f64,
        /// median normal external residual (degrees)
        norm: f64,
    },
    /// No measurement of the target was identified
    Unmatched { total: usize },
    /// A line read from the file that is not in either form; written back verbatim.
    Raw(String),
}

impl MatchSummary {
    /// Number of measurements the line accounts for, used to order an entry.
    pub fn count(&self) -> usize {
        match self {
            MatchSummary::Matched { matched, .. } => *matched,
            MatchSummary::Unmatched { total } => *total,
            MatchSummary::Raw(_) => 0,
        }
    }

    /// Parse a summary string; anything unrecognized is kept as [`MatchSummary::Raw`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let tokens: Vec<&str> = s.split_whitespace().collect();

        if let [label, total] = tokens.as_slice() {
            if *label == "???" {
                if let Ok(total) = total.parse() {
                    return MatchSummary::Unmatched { total };
                }
            }
        }

        if tokens.len() >= 4 {
            let n = tokens.len();
            let counts = tokens[n - 3].split_once('/').and_then(|(m, t)| {
                Some((m.parse::<usize>().ok()?, t.parse::<usize>().ok()?))
            });
            let tan = tokens[n - 2].parse::<f64>();
            let norm = tokens[n - 1].parse::<f64>();
            if let (Some((matched, total)), Ok(tan), Ok(norm)) = (counts, tan, norm) {
                // the label keeps its inner spacing
                let label = s
                    .rfind(tokens[n - 3])
                    .map(|end| s[..end].trim_end())
                    .unwrap_or(tokens[0]);
                return MatchSummary::Matched {
                    label: label.to_string(),
                    matched,
                    total,
                    tan,
                    norm,
                };
            }
        }

        MatchSummary::Raw(s.to_string())
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSummary::Matched {
                label,
                matched,
                total,
                tan,
                norm,
            } => write!(
                f,
                "{:<width$}  {:>3}/{:<3}  {:6.3}  {:6.3}",
                label,
                matched,
                total,
                tan,
                norm,
                width = LEDGER_LABEL_WIDTH
            ),
            MatchSummary::Unmatched { total } => {
                write!(f, "{:<width$}  {:>3}", "???", total, width = LEDGER_LABEL_WIDTH)
            }
            MatchSummary::Raw(s) => f.write_str(s),
        }
    }
}

/// Key of a ledger entry.
pub type LedgerKey = (NightDate, String);

/// An external residual of an identified measurement, input of [`summarize_matches`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedResidual {
    /// Ledger label of the matched object
    pub label: String,
    /// arcsec
    pub tan: f64,
    /// arcsec
    pub norm: f64,
}

/// Build the ledger entry of one target.
///
/// Arguments
/// -----------------
/// * `matched`: one item per identified measurement of the target (all tracks)
/// * `total`: number of measurements of the target
///
/// Return
/// ----------
/// * One [`MatchSummary::Matched`] per distinct label, with the median residuals converted to
///   degrees, sorted by decreasing count (ties keep the order of first appearance); a single
///   [`MatchSummary::Unmatched`] when nothing was identified.
pub fn summarize_matches(matched: &[MatchedResidual], total: usize) -> Vec<MatchSummary> {
    let mut labels: Vec<&str> = Vec::new();
    for m in matched {
        if !labels.contains(&m.label.as_str()) {
            labels.push(&m.label);
        }
    }

    let mut summaries: Vec<MatchSummary> = labels
        .into_iter()
        .map(|label| {
            let (tan, norm): (Vec<f64>, Vec<f64>) = matched
                .iter()
                .filter(|m| m.label == label)
                .map(|m| (m.tan, m.norm))
                .unzip();
            MatchSummary::Matched {
                label: label.to_string(),
                matched: tan.len(),
                total,
                tan: median(&tan).unwrap_or(0.0) / 3600.0,
                norm: median(&norm).unwrap_or(0.0) / 3600.0,
            }
        })
        .collect();

    if summaries.is_empty() {
        return vec![MatchSummary::Unmatched { total }];
    }
    summaries.sort_by(|a, b| b.count().cmp(&a.count()));
    summaries
}

/// The identification ledger, an ordered mapping `(night, tag) → summaries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<LedgerKey, Vec<MatchSummary>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, night: &NightDate, tag: &str) -> Option<&[MatchSummary]> {
        self.entries
            .get(&(*night, tag.trim_end().to_string()))
            .map(|v| v.as_slice())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&LedgerKey, &Vec<MatchSummary>)> {
        self.entries.iter()
    }

    /// Replace the entry of `(night, tag)` wholesale.
    pub fn merge(&mut self, night: NightDate, tag: impl Into<String>, summaries: Vec<MatchSummary>) {
        let tag: String = tag.into().chars().take(LEDGER_TAG_WIDTH).collect();
        self.entries.insert((night, tag.trim_end().to_string()), summaries);
    }

    /// Parse the persisted table.
    pub fn parse(content: &str) -> Self {
        let mut ledger = Ledger::new();
        let mut current: Option<LedgerKey> = None;

        for line in content.lines() {
            match Self::primary_line(line) {
                Some((key, summary)) => {
                    ledger.entries.insert(key.clone(), vec![summary]);
                    current = Some(key);
                }
                None => {
                    let summary = line.trim();
                    if summary.is_empty() {
                        continue;
                    }
                    if let Some(key) = &current {
                        if let Some(list) = ledger.entries.get_mut(key) {
                            list.push(MatchSummary::parse(summary));
                        }
                    }
                }
            }
        }
        ledger
    }

    fn primary_line(line: &str) -> Option<(LedgerKey, MatchSummary)> {
        let night: NightDate = line.get(..DATE_WIDTH)?.parse().ok()?;
        let tag = line
            .get(DATE_WIDTH..SUMMARY_COLUMN)
            .or_else(|| line.get(DATE_WIDTH..))
            .unwrap_or("")
            .trim()
            .to_string();
        let summary = line.get(SUMMARY_COLUMN..).unwrap_or("");
        Some(((night, tag), MatchSummary::parse(summary)))
    }

    /// Load the ledger at `path`. A missing or unreadable file gives an empty ledger.
    pub fn load(path: &Utf8Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => {
                let ledger = Self::parse(&content);
                debug!(entries = ledger.len(), "identification ledger loaded from {path}");
                ledger
            }
            Err(e) => {
                warn!("identification ledger {path} not loaded, starting empty: {e}");
                Ledger::new()
            }
        }
    }

    /// Write the whole ledger to `path`.
    pub fn persist(&self, path: &Utf8Path) -> Result<(), GeoCheckError> {
        fs::write(path, self.to_string())?;
        info!(entries = self.len(), "identification ledger written to {path}");
        Ok(())
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        for ((night, tag), summaries) in &self.entries {
            let mut lines = summaries.iter();
            let first = lines.next().map(|s| s.to_string()).unwrap_or_default();
            writeln!(f, "{:>10} {:<15} {}", night.to_string(), tag, first)?;
            for summary in lines {
                writeln!(f, "{:26} {}", "", summary)?;
            }
        }
        Ok(())
    }
}
