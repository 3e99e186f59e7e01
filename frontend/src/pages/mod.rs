//! # Page Controllers
//!
//! View-independent controllers for the two screens of the census client:
//!
//! - [`dashboard::AdminDashboard`]: summary counters, searchable household
//!   table, record detail and deletion.
//! - [`census_form::CensusForm`]: new submissions and edits of one household
//!   with its dynamic member and child sections.
//!
//! Every operation reports its outcome through a [`StatusMessage`] instead of
//! returning an error, so a failed call never leaves a screen half updated.

pub mod census_form;
pub mod dashboard;

use crate::errors::CensusError;

pub use census_form::{CensusForm, FormMode};
pub use dashboard::{AdminDashboard, PersonLine, RecordDetail, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Text shown in a screen's status area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl From<&CensusError> for StatusMessage {
    fn from(err: &CensusError) -> Self {
        Self::error(err.user_message())
    }
}
