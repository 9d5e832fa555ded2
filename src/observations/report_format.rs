//! # Report format recognition
//!
//! Input reports come in several vendor formats. Each one is a [`ReportFormat`]; the
//! pipeline hands the input file to every registered format in turn and keeps the first
//! that yields measurements.
//!
//! ## Recognition rules
//! -----------------
//! * A format that fails to read the file does not recognize it.
//! * The first format returning a **non-empty** [`TargetSet`] wins.
//! * If formats recognize the file but all produce zero measurements, the run aborts with
//!   [`GeoCheckError::NoMeasurements`]; if none recognizes it, with
//!   [`GeoCheckError::UnrecognizedReportFormat`].

use camino::Utf8Path;
use hifitime::Epoch;
use tracing::{debug, info};

use crate::constants::TargetSet;
use crate::geocheck_errors::GeoCheckError;
use crate::observations::res_reader::ResFormat;
use crate::time::round_epoch;

/// A recognizer/reader for one report file format.
pub trait ReportFormat {
    /// Short identifier of the format.
    fn name(&self) -> &str;

    /// Human-readable description, logged when the format is selected.
    fn description(&self) -> &str;

    /// Native time resolution of the format, in nanoseconds.
    fn epoch_precision_ns(&self) -> u32 {
        1_000_000_000
    }

    /// Round an epoch to the native precision of the format.
    fn round_epoch(&self, epoch: Epoch) -> Epoch {
        round_epoch(epoch, self.epoch_precision_ns())
    }

    /// Read the report at `path`.
    fn read(&self, path: &Utf8Path) -> Result<TargetSet, GeoCheckError>;
}

/// The formats known to the crate, in recognition order.
pub fn default_formats() -> Vec<Box<dyn ReportFormat>> {
    vec![Box::new(ResFormat)]
}

/// Load a report with the first format that recognizes it.
///
/// Arguments
/// -----------------
/// * `path`: the input report
/// * `formats`: candidate formats, tried in order
///
/// Return
/// ----------
/// * The targets of the report and the format that read it.
///
/// Errors
/// ----------
/// * [`GeoCheckError::UnrecognizedReportFormat`] if no format can read the file.
/// * [`GeoCheckError::NoMeasurements`] if the file is readable but holds no measurement.
pub fn load_report<'a>(
    path: &Utf8Path,
    formats: &'a [Box<dyn ReportFormat>],
) -> Result<(TargetSet, &'a dyn ReportFormat), GeoCheckError> {
    let mut recognized = false;

    for format in formats {
        match format.read(path) {
            Ok(targets) if !targets.is_empty() => {
                info!(
                    format = format.name(),
                    targets = targets.len(),
                    "{} recognized: {}",
                    path,
                    format.description()
                );
                return Ok((targets, format.as_ref()));
            }
            Ok(_) => {
                debug!(format = format.name(), "{path}: no measurements");
                recognized = true;
            }
            Err(e) => debug!(format = format.name(), "{path} not recognized: {e}"),
        }
    }

    if recognized {
        Err(GeoCheckError::NoMeasurements(path.to_string()))
    } else {
        Err(GeoCheckError::UnrecognizedReportFormat(path.to_string()))
    }
}
