//! # Census Frontend
//!
//! Client side of the church census: an admin dashboard with searchable
//! household records and a census form with dynamic member and child
//! sections, both talking to a deployed census script over HTTP.
//!
//! ## Layout
//!
//! - `state`: record filtering and the dynamic form sections
//! - `services`: HTTP client, date helpers, logging setup
//! - `pages`: controllers for the dashboard and the form
//! - `config`: YAML + environment configuration
//! - `errors`: error taxonomy shared by all of the above

pub mod config;
pub mod errors;
pub mod pages;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_utils;

pub use config::CensusConfig;
pub use errors::{CensusError, SectionError, ValidationIssue};
