//! # Orbital element representations
//!
//! Geocentric osculating elements used by the orbit export and the element dump of the
//! check report:
//!
//! - [`keplerian_element`](crate::orbit_type::keplerian_element): classical Keplerian elements
//!   `(a, e, i, Ω, ω, M)` with the conversion from a geocentric state vector.

/// Classical Keplerian elements structure and utilities.
pub mod keplerian_element;
