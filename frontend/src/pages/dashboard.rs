//! # Admin Dashboard
//!
//! Controller for the admin view of the census: summary counters, the
//! searchable household table, the record detail panel and deletion.
//!
//! ## Data Flow
//!
//! 1. [`AdminDashboard::load`] fetches the summary and every record.
//! 2. [`AdminDashboard::search`] narrows the table through the
//!    [`RecordFilterEngine`]; nothing is refetched.
//! 3. [`AdminDashboard::select`] builds the detail panel from the loaded
//!    records.
//! 4. [`AdminDashboard::delete`] removes a household and reloads.

use shared::{field, value_text, CensusEntity, CensusSummary, Record};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{CensusForm, StatusMessage};
use crate::services::api::CensusBackend;
use crate::services::date_utils;
use crate::state::{Clock, RecordFilterEngine};

/// One row of the household table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub household_id: String,
    pub block_name: String,
    pub residential_address: String,
    pub contact_no: String,
}

impl TableRow {
    fn from_record(record: &Record) -> Self {
        Self {
            household_id: record.household_text(field::HOUSEHOLD_ID),
            block_name: record.household_text(field::BLOCK_NAME),
            residential_address: record.household_text(field::RESIDENTIAL_ADDRESS),
            contact_no: record.household_text(field::CONTACT_NO),
        }
    }
}

/// A member or child as listed in the detail panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonLine {
    pub name: String,
    pub gender: String,
    pub date_of_birth: String,
    /// Whole years, an invalid-date marker, or empty without a birth date
    pub age: String,
}

impl PersonLine {
    fn from_entity<E: CensusEntity>(person: &E, today: chrono::NaiveDate) -> Self {
        let raw_dob = person.date_of_birth().unwrap_or_default();
        let age = if raw_dob.trim().is_empty() {
            String::new()
        } else {
            date_utils::derive_age(&raw_dob, today).to_string()
        };
        Self {
            name: person.display_name(),
            gender: person.field_text(field::GENDER).unwrap_or_default(),
            date_of_birth: date_utils::normalize_date_input(&raw_dob),
            age,
        }
    }
}

/// Everything shown for one selected household
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDetail {
    pub household_id: String,
    /// Household columns in name order
    pub household: Vec<(String, String)>,
    pub members: Vec<PersonLine>,
    pub children: Vec<PersonLine>,
}

impl RecordDetail {
    fn from_record(household_id: &str, record: &Record, today: chrono::NaiveDate) -> Self {
        let household = record
            .household
            .iter()
            .flat_map(|h| h.fields.iter())
            .filter_map(|(key, value)| Some((key.clone(), value_text(value)?)))
            .collect();

        Self {
            household_id: household_id.to_string(),
            household,
            members: record
                .members
                .iter()
                .flatten()
                .map(|m| PersonLine::from_entity(m, today))
                .collect(),
            children: record
                .children
                .iter()
                .flatten()
                .map(|c| PersonLine::from_entity(c, today))
                .collect(),
        }
    }
}

pub struct AdminDashboard {
    engine: RecordFilterEngine,
    summary: CensusSummary,
    selected: Option<RecordDetail>,
    status: Option<StatusMessage>,
    loading: bool,
    clock: Clock,
}

impl std::fmt::Debug for AdminDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminDashboard")
            .field("engine", &self.engine)
            .field("summary", &self.summary)
            .field("selected", &self.selected)
            .field("status", &self.status)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

impl Default for AdminDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminDashboard {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(date_utils::today))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            engine: RecordFilterEngine::new(),
            summary: CensusSummary::default(),
            selected: None,
            status: None,
            loading: false,
            clock,
        }
    }

    /// Fetch the summary counters and every record.
    ///
    /// A failed summary falls back to counting the loaded records. A failed
    /// record fetch keeps the previous records on screen.
    pub async fn load(&mut self, backend: &dyn CensusBackend) {
        info!("Loading admin dashboard");
        self.loading = true;

        let summary = backend.fetch_summary().await;
        let loaded = self.fetch_records(backend).await;

        match summary {
            Ok(summary) => self.summary = summary,
            Err(e) => {
                warn!("Summary unavailable, counting loaded records instead: {}", e);
                if loaded {
                    self.summary = self.engine.summary();
                }
            }
        }
        self.loading = false;
    }

    /// Refetch the record list without touching the summary counters
    pub async fn refresh(&mut self, backend: &dyn CensusBackend) {
        self.loading = true;
        self.fetch_records(backend).await;
        self.loading = false;
    }

    async fn fetch_records(&mut self, backend: &dyn CensusBackend) -> bool {
        match backend.list_records().await {
            Ok(records) => {
                self.engine.set_source(records);
                self.reselect();
                info!("Dashboard showing {} households", self.engine.total_len());
                self.status = Some(StatusMessage::info(format!(
                    "Loaded {} households",
                    self.engine.total_len()
                )));
                true
            }
            Err(e) => {
                error!("Failed to load census records: {}", e);
                self.status = Some(StatusMessage::from(&e));
                false
            }
        }
    }

    /// Rebuild the detail panel from fresh data, dropping it if the household is gone
    fn reselect(&mut self) {
        if let Some(id) = self.selected.as_ref().map(|d| d.household_id.clone()) {
            self.selected = None;
            self.select(&id);
        }
    }

    pub fn search(&mut self, global_term: &str, column_key: &str, column_term: &str) {
        self.engine.apply_filter(global_term, column_key, column_term);
        self.status = Some(StatusMessage::info(format!(
            "Showing {} of {} households",
            self.engine.displayed_len(),
            self.engine.total_len()
        )));
    }

    pub fn clear_search(&mut self) {
        self.engine.reset();
        self.status = None;
    }

    pub fn rows(&self) -> Vec<TableRow> {
        self.engine
            .displayed()
            .into_iter()
            .map(TableRow::from_record)
            .collect()
    }

    /// Open the detail panel for a loaded household
    pub fn select(&mut self, household_id: &str) -> Option<&RecordDetail> {
        let today = (self.clock)();
        self.selected = self
            .engine
            .find_by_household_id(household_id)
            .map(|record| RecordDetail::from_record(household_id, record, today));
        if self.selected.is_none() {
            warn!("No loaded household with id {}", household_id);
        }
        self.selected.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
    }

    /// Delete a household and reload. On failure the table is left as it was.
    pub async fn delete(&mut self, backend: &dyn CensusBackend, household_id: &str) {
        let household_id = household_id.trim();
        if household_id.is_empty() {
            self.status = Some(StatusMessage::error("No household selected"));
            return;
        }

        info!("Deleting household {}", household_id);
        match backend.delete_record(household_id).await {
            Ok(()) => {
                self.selected = None;
                self.load(backend).await;
                if !self.status.as_ref().is_some_and(StatusMessage::is_error) {
                    self.status = Some(StatusMessage::success(format!(
                        "Household {} deleted",
                        household_id
                    )));
                }
            }
            Err(e) => {
                error!("Failed to delete household {}: {}", household_id, e);
                self.status = Some(StatusMessage::from(&e));
            }
        }
    }

    /// Census form in Edit mode for a stored household
    pub async fn open_editor(
        &mut self,
        backend: &dyn CensusBackend,
        household_id: &str,
    ) -> Option<CensusForm> {
        if household_id.trim().is_empty() {
            self.status = Some(StatusMessage::error("No household selected"));
            return None;
        }

        let mut form = CensusForm::with_clock(self.clock.clone());
        form.load_for_edit(backend, household_id).await;
        match form.status() {
            Some(status) if status.is_error() => {
                self.status = Some(status.clone());
                None
            }
            _ => Some(form),
        }
    }

    pub fn summary(&self) -> CensusSummary {
        self.summary
    }

    pub fn engine(&self) -> &RecordFilterEngine {
        &self.engine
    }

    pub fn selected(&self) -> Option<&RecordDetail> {
        self.selected.as_ref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
