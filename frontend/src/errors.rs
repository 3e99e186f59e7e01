//! # Error Types
//!
//! Every failure the census client can report to a user.
//!
//! - **Transport**: the service could not be reached or answered with
//!   something unreadable. Safe to retry.
//! - **Application**: the service answered with a structured error (record not
//!   found, rejected payload). Reported with the service's own message.
//! - **Validation**: the form is not ready to submit. Raised before any network
//!   call is made.
//! - **Section**: a section operation referenced something that does not exist
//!   or cannot be edited.
//!
//! Controllers turn these into a [`crate::pages::StatusMessage`] at the
//! operation boundary; none of them is fatal.

use std::fmt;
use thiserror::Error;

use crate::state::{SectionId, SectionKind};

/// Failure of a census operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CensusError {
    #[error("Could not reach the census service: {0}")]
    Transport(String),

    #[error("{message}")]
    Application { message: String },

    #[error("{}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error(transparent)]
    Section(#[from] SectionError),
}

impl CensusError {
    pub fn application(message: impl Into<String>) -> Self {
        CensusError::Application {
            message: message.into(),
        }
    }

    /// Only connectivity failures are worth retrying unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, CensusError::Transport(_))
    }

    /// Text shown in the status area
    pub fn user_message(&self) -> String {
        match self {
            CensusError::Transport(_) => {
                "Connection problem: the census service could not be reached. Please try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A reason the census form cannot be submitted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The household has no member sections
    NoMembers,
    /// A required field of a visible sub-group is empty
    MissingRequiredField { section: String, field: &'static str },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoMembers => {
                write!(f, "A household must contain at least one member.")
            }
            ValidationIssue::MissingRequiredField { section, field } => {
                write!(f, "{}: {} is required", section, field.replace('_', " "))
            }
        }
    }
}

/// Misuse of the section manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionError {
    #[error("No {kind} section with id {id}")]
    UnknownSection { kind: SectionKind, id: SectionId },

    #[error("{kind} sections have no field named {field}")]
    UnknownField { kind: SectionKind, field: String },

    #[error("{0} is calculated automatically and cannot be edited")]
    ReadOnlyField(&'static str),

    #[error("'{value}' is not a valid choice for {field}")]
    InvalidOption { field: &'static str, value: String },

    #[error("{field} is hidden until {selector} enables it")]
    HiddenField {
        field: &'static str,
        selector: &'static str,
    },
}
