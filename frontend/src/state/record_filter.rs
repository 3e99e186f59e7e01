//! # Record Filter Engine
//!
//! Holds every record loaded from the census service and the subset currently
//! shown on the admin dashboard.
//!
//! ## Matching rules
//!
//! - Terms are trimmed and compared case-insensitively as substrings.
//! - The global term is searched in a fixed set of projections (see
//!   [`GLOBAL_HOUSEHOLD_FIELDS`] and [`person_projections`]). Timestamps and
//!   member/child identifiers are never searched globally.
//! - The column term is searched in the named column of the household and of
//!   every member and child. A missing column simply does not match.
//! - A record is shown only when both predicates pass. An empty term disables
//!   its predicate.
//! - Malformed records never match, so one broken spreadsheet row cannot break
//!   the whole list.

use shared::{field, CensusEntity, CensusSummary, Record, RecordParts};
use std::collections::BTreeSet;
use tracing::debug;

/// Household columns searched by the global term
pub const GLOBAL_HOUSEHOLD_FIELDS: &[&str] = &[
    field::HOUSEHOLD_ID,
    field::BLOCK_NAME,
    field::RESIDENTIAL_ADDRESS,
    field::CONTACT_NO,
];

/// Filter inputs as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub global_term: String,
    pub column_key: String,
    pub column_term: String,
}

impl FilterCriteria {
    pub fn new(global_term: &str, column_key: &str, column_term: &str) -> Self {
        Self {
            global_term: global_term.to_string(),
            column_key: column_key.to_string(),
            column_term: column_term.to_string(),
        }
    }

    /// Nothing would be filtered out by these criteria
    pub fn is_empty(&self) -> bool {
        let normalized = NormalizedCriteria::from(self);
        normalized.global.is_none() && normalized.column.is_none()
    }
}

/// Criteria with trimming and lowercasing applied once per pass
struct NormalizedCriteria {
    global: Option<String>,
    column: Option<(String, String)>,
}

impl From<&FilterCriteria> for NormalizedCriteria {
    fn from(criteria: &FilterCriteria) -> Self {
        let global = Some(criteria.global_term.trim().to_lowercase()).filter(|t| !t.is_empty());
        let key = criteria.column_key.trim();
        let term = criteria.column_term.trim().to_lowercase();
        let column = (!key.is_empty() && !term.is_empty()).then(|| (key.to_string(), term));
        Self { global, column }
    }
}

/// Names searched for a member or child: "First Last" and `Full_Name`
pub fn person_projections<E: CensusEntity>(person: &E) -> Vec<String> {
    let first = person.field_text(field::FIRST_NAME).unwrap_or_default();
    let last = person.field_text(field::LAST_NAME).unwrap_or_default();
    let mut projections = vec![format!("{} {}", first.trim(), last.trim())];
    if let Some(full_name) = person.field_text(field::FULL_NAME) {
        projections.push(full_name);
    }
    projections
}

/// Every text the global term is matched against
fn searchable_projections(parts: &RecordParts<'_>) -> Vec<String> {
    let mut projections: Vec<String> = GLOBAL_HOUSEHOLD_FIELDS
        .iter()
        .filter_map(|key| parts.household.field_text(key))
        .collect();
    for member in parts.members {
        projections.extend(person_projections(member));
    }
    for child in parts.children {
        projections.extend(person_projections(child));
    }
    projections
}

fn contains_term(text: &str, term: &str) -> bool {
    text.to_lowercase().contains(term)
}

fn column_matches<E: CensusEntity>(entity: &E, key: &str, term: &str) -> bool {
    entity
        .field_text(key)
        .is_some_and(|value| contains_term(&value, term))
}

fn matches_record(record: &Record, criteria: &NormalizedCriteria) -> bool {
    let Some(parts) = record.parts() else {
        return false;
    };

    let global_ok = match &criteria.global {
        None => true,
        Some(term) => searchable_projections(&parts)
            .iter()
            .any(|text| contains_term(text, term)),
    };

    let column_ok = match &criteria.column {
        None => true,
        Some((key, term)) => {
            column_matches(parts.household, key, term)
                || parts.members.iter().any(|m| column_matches(m, key, term))
                || parts.children.iter().any(|c| column_matches(c, key, term))
        }
    };

    global_ok && column_ok
}

/// Positions of the records matching `criteria`, in original order
pub fn filter_records(records: &[Record], criteria: &FilterCriteria) -> Vec<usize> {
    let normalized = NormalizedCriteria::from(criteria);
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches_record(record, &normalized))
        .map(|(position, _)| position)
        .collect()
}

/// Full record set plus the currently displayed subsequence
#[derive(Debug, Clone, Default)]
pub struct RecordFilterEngine {
    all_records: Vec<Record>,
    displayed: Vec<usize>,
    criteria: FilterCriteria,
}

impl RecordFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record set after a fetch. Clears any filter so stale
    /// criteria never hide newly loaded data.
    pub fn set_source(&mut self, records: Vec<Record>) {
        let malformed = records.iter().filter(|r| !r.is_well_formed()).count();
        debug!(total = records.len(), malformed, "Replacing record source");
        self.all_records = records;
        self.criteria = FilterCriteria::default();
        self.show_all();
    }

    pub fn apply_filter(&mut self, global_term: &str, column_key: &str, column_term: &str) {
        self.apply(FilterCriteria::new(global_term, column_key, column_term));
    }

    pub fn apply(&mut self, criteria: FilterCriteria) {
        self.displayed = filter_records(&self.all_records, &criteria);
        debug!(
            ?criteria,
            displayed = self.displayed.len(),
            total = self.all_records.len(),
            "Applied record filter"
        );
        self.criteria = criteria;
    }

    /// Clear both terms and show every record again
    pub fn reset(&mut self) {
        self.criteria = FilterCriteria::default();
        self.show_all();
    }

    fn show_all(&mut self) {
        self.displayed = (0..self.all_records.len()).collect();
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn all_records(&self) -> &[Record] {
        &self.all_records
    }

    pub fn displayed(&self) -> Vec<&Record> {
        self.displayed.iter().map(|&i| &self.all_records[i]).collect()
    }

    pub fn displayed_positions(&self) -> &[usize] {
        &self.displayed
    }

    pub fn displayed_len(&self) -> usize {
        self.displayed.len()
    }

    pub fn total_len(&self) -> usize {
        self.all_records.len()
    }

    /// Look up a loaded record by `Household_ID`, ignoring the filter
    pub fn find_by_household_id(&self, household_id: &str) -> Option<&Record> {
        self.all_records
            .iter()
            .find(|r| r.household_id().as_deref() == Some(household_id))
    }

    /// Column names offered by the column-filter selector
    pub fn column_keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        for parts in self.all_records.iter().filter_map(Record::parts) {
            keys.extend(parts.household.fields.keys().cloned());
            for member in parts.members {
                keys.extend(member.fields.keys().cloned());
            }
            for child in parts.children {
                keys.extend(child.fields.keys().cloned());
            }
        }
        keys.into_iter().collect()
    }

    /// Counts over everything loaded, regardless of the filter
    pub fn summary(&self) -> CensusSummary {
        CensusSummary::from_records(&self.all_records)
    }
}
