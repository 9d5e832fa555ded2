//! Post-process a geostationary astrometry report.
//!
//! ```bash
//! geocheck 20140512_10092.res --save-orbit uncorrelated --latitude 43.75 --longitude 6.92
//! ```
//!
//! Writes `<filename>.check`, updates the identification ledger and, depending on
//! `--save-orbit`, one `.orbit` file per target.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::{error, info};

use geocheck::geocheck_errors::GeoCheckError;
use geocheck::orbit_export::SaveOrbit;
use geocheck::params::{PostprocessParams, PostprocessParamsBuilder};
use geocheck::pipeline::{postprocess, Collaborators};

#[derive(Parser, Debug)]
#[command(name = "geocheck")]
#[command(about = "Residual checks, catalog identification ledger and orbit export for GEO tracks")]
struct Args {
    /// Report file to process
    filename: Utf8PathBuf,

    /// TOML file with the run parameters; command-line options override it
    #[arg(long, value_name = "FILE")]
    config: Option<Utf8PathBuf>,

    /// Maximum track duration (minutes)
    #[arg(long)]
    max_track_len: Option<f64>,

    /// Which fitted orbits are written to .orbit files
    #[arg(long, value_enum)]
    save_orbit: Option<SaveOrbit>,

    /// Split tracks by catalog match before cutting them by duration
    #[arg(long)]
    split_by_match: bool,

    /// Do not append osculating elements to the check report
    #[arg(long)]
    no_dump_orbit: bool,

    /// Site latitude (degrees, north positive)
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Site longitude (degrees, east positive)
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Site altitude (m)
    #[arg(long, allow_hyphen_values = true)]
    altitude: Option<f64>,

    /// Identification ledger file
    #[arg(long, value_name = "FILE", env = "GEOCHECK_LEDGER")]
    ledger: Option<Utf8PathBuf>,
}

fn build_params(args: &Args) -> Result<PostprocessParams, GeoCheckError> {
    let base = match &args.config {
        Some(path) => PostprocessParams::from_toml_file(path)?,
        None => PostprocessParams::default(),
    };

    let mut builder = PostprocessParamsBuilder::from_params(base);
    if let Some(v) = args.max_track_len {
        builder = builder.max_track_len(v);
    }
    if let Some(v) = args.save_orbit {
        builder = builder.save_orbit(v);
    }
    if args.split_by_match {
        builder = builder.split_by_match(true);
    }
    if args.no_dump_orbit {
        builder = builder.dump_orbit(false);
    }
    if let Some(v) = args.latitude {
        builder = builder.latitude(v);
    }
    if let Some(v) = args.longitude {
        builder = builder.longitude(v);
    }
    if let Some(v) = args.altitude {
        builder = builder.altitude(v);
    }
    if let Some(path) = &args.ledger {
        builder = builder.ledger_path(path.clone());
    }
    builder.build()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let params = match build_params(&args) {
        Ok(params) => params,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match postprocess(&args.filename, &params, &Collaborators::default(), None) {
        Ok(summary) => {
            info!("{} target(s), {} track(s)", summary.targets, summary.tracks);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}: {e}", args.filename);
            ExitCode::FAILURE
        }
    }
}
