//! # Post-processing parameters
//!
//! [`PostprocessParams`] gathers every option of a run. It is built either
//!
//! * programmatically with [`PostprocessParams::builder`], or
//! * from a TOML file with [`PostprocessParams::from_toml_file`],
//!
//! and both paths go through the same validation.
//!
//! ```toml
//! max_track_len = 300.0
//! save_orbit = "uncorrelated"
//! split_by_match = false
//! dump_orbit = true
//! ledger_path = "ident.txt"
//! orbit_dir = "."
//!
//! [site]
//! latitude = 43.75
//! longitude = 6.92
//! altitude = 1270.0
//! ```

use std::cmp::Ordering::Greater;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::constants::{Degree, Meter};
use crate::geocheck_errors::GeoCheckError;
use crate::observers::Site;
use crate::orbit_export::SaveOrbit;

/// Geodetic coordinates of the observing site.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SiteParams {
    /// Geodetic latitude (degrees, north positive)
    pub latitude: Degree,
    /// Longitude (degrees, east positive)
    pub longitude: Degree,
    /// Altitude above the ellipsoid (m)
    pub altitude: Meter,
}

impl SiteParams {
    pub fn to_site(&self) -> Result<Site, GeoCheckError> {
        Site::new(self.latitude, self.longitude, self.altitude)
    }
}

/// Options of a post-processing run.
///
/// Defaults
/// -----------------
/// * `max_track_len`: 300 min
/// * `save_orbit`: [`SaveOrbit::None`]
/// * `split_by_match`: `false`
/// * `dump_orbit`: `true`
/// * `site`: latitude, longitude and altitude 0
/// * `ledger_path`: `ident.txt`
/// * `orbit_dir`: `.`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostprocessParams {
    /// Maximum duration of a track, in minutes
    pub max_track_len: f64,
    /// Which fitted orbits are exported to `.orbit` files
    pub save_orbit: SaveOrbit,
    /// Split tracks by catalog match before cutting them by duration
    pub split_by_match: bool,
    /// Append osculating elements to each track of the check report
    pub dump_orbit: bool,
    pub site: SiteParams,
    /// Identification ledger file
    pub ledger_path: Utf8PathBuf,
    /// Output directory of `.orbit` files
    pub orbit_dir: Utf8PathBuf,
}

impl Default for PostprocessParams {
    fn default() -> Self {
        PostprocessParams {
            max_track_len: 300.0,
            save_orbit: SaveOrbit::None,
            split_by_match: false,
            dump_orbit: true,
            site: SiteParams::default(),
            ledger_path: Utf8PathBuf::from("ident.txt"),
            orbit_dir: Utf8PathBuf::from("."),
        }
    }
}

impl PostprocessParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`PostprocessParamsBuilder`] initialized with the defaults.
    ///
    /// ```rust,no_run
    /// use geocheck::params::PostprocessParams;
    /// use geocheck::orbit_export::SaveOrbit;
    ///
    /// let params = PostprocessParams::builder()
    ///     .max_track_len(120.0)
    ///     .save_orbit(SaveOrbit::Uncorrelated)
    ///     .site(43.75, 6.92, 1270.0)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> PostprocessParamsBuilder {
        PostprocessParamsBuilder::new()
    }

    /// Load and validate parameters from a TOML file; missing keys take their default.
    pub fn from_toml_file(path: &Utf8Path) -> Result<Self, GeoCheckError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, GeoCheckError> {
        let params: PostprocessParams = toml::from_str(content)?;
        params.validate()
    }

    /// Validate the parameters.
    ///
    /// Validation rules
    /// -----------------
    /// * `max_track_len` is finite and strictly positive.
    /// * `site.latitude` is in [-90, 90].
    /// * `site.longitude` and `site.altitude` are finite.
    pub fn validate(self) -> Result<Self, GeoCheckError> {
        let gt0 = |x: f64| x.partial_cmp(&0.0) == Some(Greater);

        if !(self.max_track_len.is_finite() && gt0(self.max_track_len)) {
            return Err(GeoCheckError::InvalidParameter(format!(
                "max_track_len must be a positive number of minutes, got {}",
                self.max_track_len
            )));
        }
        if !(-90.0..=90.0).contains(&self.site.latitude) {
            return Err(GeoCheckError::InvalidParameter(format!(
                "site latitude must be in [-90, 90], got {}",
                self.site.latitude
            )));
        }
        if !self.site.longitude.is_finite() || !self.site.altitude.is_finite() {
            return Err(GeoCheckError::InvalidParameter(format!(
                "site longitude and altitude must be finite, got {} / {}",
                self.site.longitude, self.site.altitude
            )));
        }
        Ok(self)
    }
}

/// Builder for [`PostprocessParams`], with validation.
#[derive(Debug, Clone)]
pub struct PostprocessParamsBuilder {
    params: PostprocessParams,
}

impl Default for PostprocessParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PostprocessParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: PostprocessParams::default(),
        }
    }

    /// Start from existing parameters (e.g. loaded from a file) to apply overrides.
    pub fn from_params(params: PostprocessParams) -> Self {
        Self { params }
    }

    pub fn max_track_len(mut self, v: f64) -> Self {
        self.params.max_track_len = v;
        self
    }
    pub fn save_orbit(mut self, v: SaveOrbit) -> Self {
        self.params.save_orbit = v;
        self
    }
    pub fn split_by_match(mut self, v: bool) -> Self {
        self.params.split_by_match = v;
        self
    }
    pub fn dump_orbit(mut self, v: bool) -> Self {
        self.params.dump_orbit = v;
        self
    }
    pub fn site(mut self, latitude: Degree, longitude: Degree, altitude: Meter) -> Self {
        self.params.site = SiteParams {
            latitude,
            longitude,
            altitude,
        };
        self
    }
    pub fn latitude(mut self, v: Degree) -> Self {
        self.params.site.latitude = v;
        self
    }
    pub fn longitude(mut self, v: Degree) -> Self {
        self.params.site.longitude = v;
        self
    }
    pub fn altitude(mut self, v: Meter) -> Self {
        self.params.site.altitude = v;
        self
    }
    pub fn ledger_path(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.params.ledger_path = v.into();
        self
    }
    pub fn orbit_dir(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.params.orbit_dir = v.into();
        self
    }

    /// Finalize the builder.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(PostprocessParams)` when every rule of [`PostprocessParams::validate`] holds.
    /// * `Err(GeoCheckError::InvalidParameter)` otherwise.
    pub fn build(self) -> Result<PostprocessParams, GeoCheckError> {
        self.params.validate()
    }
}
