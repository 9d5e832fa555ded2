//! # Post-processing pipeline
//!
//! [`postprocess`] runs one report file through every stage:
//!
//! 1. load the report with the first [`ReportFormat`](crate::observations::report_format::ReportFormat)
//!    that recognizes it (fatal on failure, nothing is written);
//! 2. identify every measurement against the catalog ([`resolve_matches`]);
//! 3. for each target: segment into tracks, compute residuals, summarize, write the check
//!    report section, export orbits and dump elements;
//! 4. merge each target's identifications into the ledger and persist it.
//!
//! Track-level and epoch-level failures are logged and never abort the run.

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use crate::catalog::{resolve_matches, CatalogMatcher, NoCatalog};
use crate::check_report::{
    dump_epoch, matched_elements, ElementDump, FrameNames, TargetHeader, TrackTable,
};
use crate::constants::TargetTag;
use crate::geocheck_errors::GeoCheckError;
use crate::ledger::{summarize_matches, Ledger, MatchedResidual};
use crate::observations::report_format::{default_formats, load_report, ReportFormat};
use crate::observations::TargetSeries;
use crate::observers::Site;
use crate::orbit_export::{reduced_magnitudes, write_orbit, OrbitRecord};
use crate::orbit_fit::{NoOrbitFitter, OrbitFitter};
use crate::params::PostprocessParams;
use crate::ref_system::{FrameTransform, MeanOfDate};
use crate::residuals::{ResidualEngine, TrackResiduals};
use crate::statistics::TrackSummary;
use crate::time::{mjd_utc, NightDate};
use crate::tracks::build_tracks;

/// External services used by a run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub matcher: &'a dyn CatalogMatcher,
    pub fitter: &'a dyn OrbitFitter,
    pub frame: &'a dyn FrameTransform,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        matcher: &'a dyn CatalogMatcher,
        fitter: &'a dyn OrbitFitter,
        frame: &'a dyn FrameTransform,
    ) -> Self {
        Collaborators {
            matcher,
            fitter,
            frame,
        }
    }
}

/// No catalog, no orbit fitter, mean equator and equinox of date.
impl Default for Collaborators<'static> {
    fn default() -> Self {
        Collaborators {
            matcher: &NoCatalog,
            fitter: &NoOrbitFitter,
            frame: &MeanOfDate,
        }
    }
}

/// Counters of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub check_path: Utf8PathBuf,
    pub targets: usize,
    pub tracks: usize,
    pub measurements: usize,
    pub identified: usize,
    pub orbit_files: usize,
    pub ledger_entries: usize,
}

/// Path of the check report of an input file, `<input>.check`.
pub fn check_path(input: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{input}.check"))
}

/// Post-process a report file.
///
/// Arguments
/// -----------------
/// * `input`: the report file
/// * `params`: run options
/// * `collaborators`: catalog, orbit fitter and frame services
/// * `frames`: optional image file names by epoch, shown as the first column of the report;
///   their epochs are rounded to the precision of the report format
///
/// Return
/// ----------
/// * The run counters. Errors are limited to an unreadable/empty report, an invalid site and
///   I/O failures on the check report; ledger and orbit file failures are only logged.
pub fn postprocess(
    input: &Utf8Path,
    params: &PostprocessParams,
    collaborators: &Collaborators,
    frames: Option<&FrameNames>,
) -> Result<RunSummary, GeoCheckError> {
    info!("post-processing observations from {input}");
    let formats = default_formats();
    let (targets, format) = load_report(input, &formats)?;
    let measurements: usize = targets.values().map(|m| m.len()).sum();
    info!(
        measurements,
        targets = targets.len(),
        "loaded from {input} ({})",
        format.description()
    );

    let site = params.site.to_site()?;
    let frames = frames.map(|names| align_frame_names(names, format));
    let matches = resolve_matches(&targets, collaborators.matcher);
    let mut ledger = Ledger::load(&params.ledger_path);

    let engine = ResidualEngine {
        site: &site,
        frame: collaborators.frame,
        matcher: collaborators.matcher,
        fitter: collaborators.fitter,
        matches: &matches,
    };

    let mut summary = RunSummary {
        check_path: check_path(input),
        measurements,
        identified: matches.len(),
        ..Default::default()
    };
    let mut out = BufWriter::new(File::create(&summary.check_path)?);

    for (tag, target_measurements) in &targets {
        let Some(first_epoch) = target_measurements.keys().next().copied() else {
            continue;
        };
        info!(target_tag = %tag, measurements = target_measurements.len(), "processing target");

        let series = TargetSeries::from_measurements(tag, target_measurements);
        let tracks = build_tracks(&series, &matches, params.max_track_len, params.split_by_match);
        writeln!(out, "{}", TargetHeader { tag, tracks: tracks.len() })?;

        let mut matched = Vec::new();
        for (n, track) in tracks.into_iter().enumerate() {
            debug!(target_tag = %tag, track = n + 1, measurements = track.len(), "processing track");
            let result = engine.process_track(track);
            let track_summary = TrackSummary::from_residuals(&result);

            writeln!(
                out,
                "{}",
                TrackTable {
                    result: &result,
                    summary: &track_summary,
                    frames: frames.as_ref(),
                }
            )?;

            if params.save_orbit.accepts(track_summary.uncorrelated)
                && export_orbit(tag, &result, &track_summary, &site, params, collaborators)
            {
                summary.orbit_files += 1;
            }

            if params.dump_orbit {
                write_element_dump(&mut out, &result, &track_summary, collaborators)?;
            }

            matched.extend(result.records.iter().filter_map(|r| {
                let (tan, norm) = r.external.as_ref().ok()?;
                Some(MatchedResidual {
                    label: r.object.as_ref()?.ledger_label(),
                    tan: *tan,
                    norm: *norm,
                })
            }));
            summary.tracks += 1;
        }
        writeln!(out, "\n")?;

        ledger.merge(
            NightDate::of_epoch(first_epoch),
            tag.ledger_key(),
            summarize_matches(&matched, target_measurements.len()),
        );
        summary.targets += 1;
    }
    out.flush()?;
    info!("check report written to {}", summary.check_path);

    summary.ledger_entries = ledger.len();
    if let Err(e) = ledger.persist(&params.ledger_path) {
        warn!("identification ledger not saved to {}: {e}", params.ledger_path);
    }

    info!(
        targets = summary.targets,
        tracks = summary.tracks,
        measurements = summary.measurements,
        identified = summary.identified,
        orbit_files = summary.orbit_files,
        ledger_entries = summary.ledger_entries,
        "post-processing done"
    );
    Ok(summary)
}

/// Re-key frame names on the epochs as the report format rounds them.
fn align_frame_names(names: &FrameNames, format: &dyn ReportFormat) -> FrameNames {
    names
        .iter()
        .map(|(epoch, name)| (format.round_epoch(*epoch), name.clone()))
        .collect()
}

/// Export the orbit of a fitted track; failures are logged.
fn export_orbit(
    tag: &TargetTag,
    result: &TrackResiduals,
    track_summary: &TrackSummary,
    site: &Site,
    params: &PostprocessParams,
    collaborators: &Collaborators,
) -> bool {
    let Some(fit) = result.orbit_fit() else {
        return false;
    };
    let mags = reduced_magnitudes(result, collaborators.fitter, site);
    let eqeq = collaborators
        .frame
        .equation_of_equinoxes(mjd_utc(&fit.orbit.reference_epoch));

    let written = OrbitRecord::new(tag, result, track_summary.sublon, &mags, eqeq)
        .and_then(|record| write_orbit(&params.orbit_dir, tag, &record));
    match written {
        Ok(_) => true,
        Err(e) => {
            warn!(target_tag = %tag, "orbit not saved: {e}");
            false
        }
    }
}

fn write_element_dump(
    out: &mut impl Write,
    result: &TrackResiduals,
    track_summary: &TrackSummary,
    collaborators: &Collaborators,
) -> Result<(), GeoCheckError> {
    let Some(epoch) = dump_epoch(result) else {
        return Ok(());
    };
    let matched = matched_elements(result, collaborators.matcher, epoch);
    let dump = ElementDump {
        fitted: result.orbit_fit().map(|fit| &fit.orbit),
        matched: &matched,
        sublon: track_summary.sublon,
    }
    .to_string();
    if !dump.is_empty() {
        writeln!(out, "{dump}")?;
    }
    Ok(())
}
