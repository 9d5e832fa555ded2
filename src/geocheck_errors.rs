use thiserror::Error;

use crate::observations::res_reader::ParseResError;

#[derive(Error, Debug)]
pub enum GeoCheckError {
    #[error("Unrecognized report format: {0}")]
    UnrecognizedReportFormat(String),

    #[error("No measurements found in report: {0}")]
    NoMeasurements(String),

    #[error("Error during the .res file parsing (line {line}): {source}")]
    ParsingResFileError { line: usize, source: ParseResError },

    #[error("Invalid post-processing parameter: {0}")]
    InvalidParameter(String),

    #[error("Orbit fit failed: {0}")]
    OrbitFitFailed(String),

    #[error("Catalog ephemeris unavailable for {0}")]
    EphemerisUnavailable(String),

    #[error("Degenerate state vector: {0}")]
    DegenerateState(String),

    #[error("Kepler equation did not converge (e = {ecc}, M = {mean_anomaly})")]
    KeplerNoConvergence { ecc: f64, mean_anomaly: f64 },

    #[error("Identification ledger error: {0}")]
    LedgerParse(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("UTF-8 Path error: {0}")]
    Utf8PathError(String),

    #[error("NaN value encountered: {0}")]
    InvalidFloatValue(#[from] ordered_float::FloatIsNan),
}

impl PartialEq for GeoCheckError {
    fn eq(&self, other: &Self) -> bool {
        use GeoCheckError::*;
        match (self, other) {
            (UnrecognizedReportFormat(a), UnrecognizedReportFormat(b)) => a == b,
            (NoMeasurements(a), NoMeasurements(b)) => a == b,
            (
                ParsingResFileError {
                    line: l1,
                    source: s1,
                },
                ParsingResFileError {
                    line: l2,
                    source: s2,
                },
            ) => l1 == l2 && s1 == s2,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (OrbitFitFailed(a), OrbitFitFailed(b)) => a == b,
            (EphemerisUnavailable(a), EphemerisUnavailable(b)) => a == b,
            (DegenerateState(a), DegenerateState(b)) => a == b,
            (
                KeplerNoConvergence {
                    ecc: e1,
                    mean_anomaly: m1,
                },
                KeplerNoConvergence {
                    ecc: e2,
                    mean_anomaly: m2,
                },
            ) => e1 == e2 && m1 == m2,
            (LedgerParse(a), LedgerParse(b)) => a == b,
            (Utf8PathError(a), Utf8PathError(b)) => a == b,

            // not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (ConfigError(_), ConfigError(_)) => true,
            (InvalidFloatValue(_), InvalidFloatValue(_)) => true,

            _ => false,
        }
    }
}

/// Reason why a per-measurement external residual is absent.
///
/// These are recoverable conditions: the measurement keeps its row in the check report with
/// blank external residual columns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResidualAbsence {
    #[error("no catalog match at this epoch")]
    NoMatch,

    #[error("catalog ephemeris unavailable: {0}")]
    Ephemeris(String),

    #[error("degenerate line-of-sight frame")]
    DegenerateFrame,
}

impl From<GeoCheckError> for ResidualAbsence {
    fn from(err: GeoCheckError) -> Self {
        match err {
            GeoCheckError::DegenerateState(_) => ResidualAbsence::DegenerateFrame,
            other => ResidualAbsence::Ephemeris(other.to_string()),
        }
    }
}
