pub mod catalog;
pub mod check_report;
pub mod constants;
mod conversion;
pub mod geocheck_errors;
mod kepler;
pub mod ledger;
pub mod observations;
pub mod observers;
pub mod orbit_export;
pub mod orbit_fit;
pub mod orbit_type;
pub mod params;
pub mod pipeline;
pub mod ref_system;
pub mod reference_elements;
pub mod residuals;
pub mod statistics;
pub mod time;
pub mod tracks;
