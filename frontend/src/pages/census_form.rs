//! # Census Form
//!
//! Controller behind the household census form. The same form serves new
//! submissions and edits of an existing household.
//!
//! ## Flow
//!
//! 1. [`CensusForm::new_submission`] or [`CensusForm::load_for_edit`] sets the
//!    mode and fills the household fields and sections.
//! 2. The view writes through [`CensusForm::set_household_field`] and the
//!    section operations.
//! 3. [`CensusForm::submit`] validates locally, then sends `SUBMIT_NEW` or
//!    `UPDATE`. Nothing is sent while validation fails.

use shared::field::HOUSEHOLD_ID;
use shared::{value_text, CensusEntity, CensusSubmission, Record, SectionData};
use tracing::{info, warn};

use super::StatusMessage;
use crate::errors::CensusError;
use crate::services::api::CensusBackend;
use crate::state::{Clock, DynamicSectionManager, SectionId, SectionKind};

/// Household columns edited by the form, in display order
pub const HOUSEHOLD_FIELDS: &[&str] = &[
    "Household_ID",
    "Block_Name",
    "Residential_Address",
    "Contact_No",
    "Physical_Address",
    "Ward",
];

pub const SUBMIT_LABEL_NEW: &str = "Submit Census Data";
pub const SUBMIT_LABEL_EDIT: &str = "UPDATE RECORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    New,
    Edit { household_id: String },
}

#[derive(Debug)]
pub struct CensusForm {
    mode: FormMode,
    household: SectionData,
    /// Stored household columns the form does not edit
    household_extra: SectionData,
    sections: DynamicSectionManager,
    status: Option<StatusMessage>,
    submitting: bool,
}

impl Default for CensusForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CensusForm {
    /// Blank form for a new household
    pub fn new() -> Self {
        Self::with_sections(DynamicSectionManager::new())
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self::with_sections(DynamicSectionManager::with_clock(clock))
    }

    fn with_sections(sections: DynamicSectionManager) -> Self {
        let mut form = Self {
            mode: FormMode::New,
            household: SectionData::new(),
            household_extra: SectionData::new(),
            sections,
            status: None,
            submitting: false,
        };
        form.new_submission();
        form
    }

    /// Start over with an empty household and one empty member
    pub fn new_submission(&mut self) {
        self.mode = FormMode::New;
        self.household = empty_household();
        self.household_extra.clear();
        self.sections.reset();
        self.status = None;
    }

    /// Replace the form contents with a stored household.
    ///
    /// On failure the form keeps whatever it showed before.
    pub async fn load_for_edit(&mut self, backend: &dyn CensusBackend, household_id: &str) {
        let household_id = household_id.trim();
        if household_id.is_empty() {
            self.status = Some(StatusMessage::error("No household id given"));
            return;
        }

        info!("Loading household {} for editing", household_id);
        match backend.fetch_record(household_id).await {
            Ok(Some(record)) => {
                self.fill_from_record(household_id, &record);
                self.status = Some(StatusMessage::info(format!(
                    "Editing household {}",
                    household_id
                )));
            }
            Ok(None) => {
                warn!("Household {} not found", household_id);
                self.status = Some(StatusMessage::error(format!(
                    "Household {} not found",
                    household_id
                )));
            }
            Err(e) => {
                warn!("Failed to load household {}: {}", household_id, e);
                self.status = Some(StatusMessage::from(&e));
            }
        }
    }

    fn fill_from_record(&mut self, household_id: &str, record: &Record) {
        let mut household = empty_household();
        let mut household_extra = SectionData::new();
        if let Some(stored) = &record.household {
            for (key, value) in &stored.fields {
                let Some(text) = value_text(value) else {
                    continue;
                };
                if household.contains_key(key) {
                    household.insert(key.clone(), text);
                } else {
                    household_extra.insert(key.clone(), text);
                }
            }
        }
        household.insert(HOUSEHOLD_ID.to_string(), household_id.to_string());

        self.sections.clear();
        for member in record.members.iter().flatten() {
            self.sections.add_section(SectionKind::Member, Some(member.fields()));
        }
        for child in record.children.iter().flatten() {
            self.sections.add_section(SectionKind::Child, Some(child.fields()));
        }
        if self.sections.len(SectionKind::Member) == 0 {
            self.sections.add_section(SectionKind::Member, None);
        }

        self.household = household;
        self.household_extra = household_extra;
        self.mode = FormMode::Edit {
            household_id: household_id.to_string(),
        };
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn household(&self) -> &SectionData {
        &self.household
    }

    pub fn household_value(&self, key: &str) -> &str {
        self.household.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn sections(&self) -> &DynamicSectionManager {
        &self.sections
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::New => SUBMIT_LABEL_NEW,
            FormMode::Edit { .. } => SUBMIT_LABEL_EDIT,
        }
    }

    /// Write a household field. The id of a stored household cannot change.
    pub fn set_household_field(&mut self, key: &str, value: &str) {
        if !HOUSEHOLD_FIELDS.iter().any(|field| *field == key) {
            self.status = Some(StatusMessage::error(format!(
                "Unknown household field {}",
                key
            )));
            return;
        }
        if key == HOUSEHOLD_ID && matches!(self.mode, FormMode::Edit { .. }) {
            self.status = Some(StatusMessage::error(
                "The household id of a stored record cannot be changed",
            ));
            return;
        }
        self.household.insert(key.to_string(), value.to_string());
    }

    pub fn add_member(&mut self) -> SectionId {
        self.sections.add_section(SectionKind::Member, None)
    }

    pub fn add_child(&mut self) -> SectionId {
        self.sections.add_section(SectionKind::Child, None)
    }

    pub fn remove_section(&mut self, id: SectionId) {
        if let Err(e) = self.sections.remove_section(id.kind(), id) {
            self.status = Some(StatusMessage::from(&CensusError::from(e)));
        }
    }

    pub fn set_section_field(&mut self, id: SectionId, field_name: &str, value: &str) {
        if let Err(e) = self.sections.set_field_value(id, field_name, value) {
            self.status = Some(StatusMessage::from(&CensusError::from(e)));
        }
    }

    /// Payload for the backend, household fields plus every section.
    /// Stored columns the form does not edit are sent back unchanged.
    pub fn submission(&self) -> CensusSubmission {
        let sections = self.sections.serialize();
        let mut household = self.household_extra.clone();
        household.extend(self.household.clone());
        CensusSubmission {
            household,
            members: sections.members,
            children: sections.children,
        }
    }

    /// Validate and send the form. A new household resets the form on success.
    pub async fn submit(&mut self, backend: &dyn CensusBackend) {
        if self.submitting {
            return;
        }

        let issues = self.sections.validate();
        if !issues.is_empty() {
            self.status = Some(StatusMessage::from(&CensusError::Validation(issues)));
            return;
        }

        self.submitting = true;
        self.status = Some(StatusMessage::info("Submitting..."));
        let submission = self.submission();

        let outcome = match &self.mode {
            FormMode::New => backend.create_record(submission).await.map(Some),
            FormMode::Edit { household_id } => backend
                .update_record(household_id, submission)
                .await
                .map(|_| None),
        };
        self.submitting = false;

        match outcome {
            Ok(Some(new_id)) => {
                info!("Census submission stored as household {}", new_id);
                self.new_submission();
                self.status = Some(StatusMessage::success(format!(
                    "Census data submitted successfully. Household ID: {}",
                    new_id
                )));
            }
            Ok(None) => {
                self.status = Some(StatusMessage::success("Record updated successfully"));
            }
            Err(e) => {
                warn!("Census submission failed: {}", e);
                self.status = Some(StatusMessage::from(&e));
            }
        }
    }
}

fn empty_household() -> SectionData {
    HOUSEHOLD_FIELDS
        .iter()
        .map(|key| (key.to_string(), String::new()))
        .collect()
}
