//! # Dynamic Section Manager
//!
//! Owns the repeatable Member and Child sections of the census form as plain
//! data. The view renders from this state and never has to be read back on
//! submit.
//!
//! ## Invariants
//!
//! - Display indices of each kind are always `1..=N` in current order.
//! - Fields of a hidden sub-group are cleared the moment the group is hidden
//!   and reject writes until it is shown again.
//! - A child's `Age` always matches its stored `Date_of_Birth`.
//! - Removing the last Member section leaves one empty Member section behind.

use chrono::NaiveDate;
use shared::field::{AGE, DATE_OF_BIRTH, DOB_LEGACY};
use shared::{value_text, FieldMap, SectionData};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::section_templates::{FieldSpec, FieldType, GateSpec, SectionKind, SectionTemplate};
use crate::errors::{SectionError, ValidationIssue};
use crate::services::date_utils;

/// Source of "today" for age calculation
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Handle of a section, stable for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId {
    kind: SectionKind,
    serial: u64,
}

impl SectionId {
    pub fn kind(&self) -> SectionKind {
        self.kind
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.label().to_lowercase(), self.serial)
    }
}

/// Current state of one field in a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    pub spec: &'static FieldSpec,
    pub value: String,
    pub visible: bool,
    pub required: bool,
}

impl FieldState {
    fn new(spec: &'static FieldSpec) -> Self {
        Self {
            spec,
            value: String::new(),
            visible: spec.field_type != FieldType::Hidden,
            required: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }
}

/// One Member or Child sub-form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    index: usize,
    fields: Vec<FieldState>,
    /// Stored columns the form does not edit, sent back unchanged
    extra: SectionData,
}

impl Section {
    fn from_template(id: SectionId) -> Self {
        let template = id.kind.template();
        Self {
            id,
            index: 0,
            fields: template.fields.iter().map(FieldState::new).collect(),
            extra: SectionData::new(),
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn kind(&self) -> SectionKind {
        self.id.kind
    }

    /// 1-based position among sections of the same kind
    pub fn index(&self) -> usize {
        self.index
    }

    /// Heading shown above the section, e.g. "Child 2"
    pub fn title(&self) -> String {
        format!("{} {}", self.kind().label(), self.index)
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.spec.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value.as_str())
    }

    /// Whether a gated sub-group is currently shown
    pub fn group_visible(&self, group: &str) -> bool {
        self.template()
            .gates
            .iter()
            .find(|gate| gate.group == group)
            .and_then(|gate| gate.fields.first())
            .and_then(|name| self.field(name))
            .is_some_and(|f| f.visible)
    }

    pub fn extra(&self) -> &SectionData {
        &self.extra
    }

    /// Template fields merged over the carried-through columns.
    ///
    /// A legacy `DOB` column follows the edited `Date_of_Birth`.
    pub fn to_data(&self) -> SectionData {
        let mut data = self.extra.clone();
        if let Some(dob) = data.get_mut(DOB_LEGACY) {
            *dob = self.value(DATE_OF_BIRTH).unwrap_or_default().to_string();
        }
        data.extend(
            self.fields
                .iter()
                .map(|f| (f.spec.name.to_string(), f.value.clone())),
        );
        data
    }

    fn template(&self) -> &'static SectionTemplate {
        self.id.kind.template()
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.iter_mut().find(|f| f.spec.name == name)
    }

    fn set_raw(&mut self, name: &str, value: String) {
        if let Some(field) = self.field_mut(name) {
            field.value = value;
        }
    }

    /// Show or hide a gated sub-group according to its selector's value
    fn apply_gate(&mut self, gate: &GateSpec) {
        let active = gate.is_active(self.value(gate.selector).unwrap_or_default());
        for name in gate.fields {
            if let Some(field) = self.field_mut(name) {
                field.visible = active;
                if active {
                    field.required = gate.required.contains(name);
                } else {
                    field.value.clear();
                    field.required = false;
                }
            }
        }
        debug!(section = %self.id, group = gate.group, active, "Applied sub-group visibility");
    }

    fn apply_all_gates(&mut self) {
        for gate in self.template().gates {
            self.apply_gate(gate);
        }
    }

    fn recompute_age(&mut self, today: NaiveDate) {
        if self.kind() != SectionKind::Child {
            return;
        }
        let dob = self.value(DATE_OF_BIRTH).unwrap_or_default().to_string();
        let age = date_utils::derive_age(&dob, today);
        self.set_raw(AGE, age.to_string());
    }
}

/// Sections of one kind flattened for submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedSections {
    pub members: Vec<SectionData>,
    pub children: Vec<SectionData>,
}

/// Manages the Member and Child sections of one census form
pub struct DynamicSectionManager {
    members: Vec<Section>,
    children: Vec<Section>,
    next_serial: u64,
    clock: Clock,
}

impl fmt::Debug for DynamicSectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSectionManager")
            .field("members", &self.members)
            .field("children", &self.children)
            .field("next_serial", &self.next_serial)
            .finish_non_exhaustive()
    }
}

impl Default for DynamicSectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicSectionManager {
    /// Empty manager using the local date for ages
    pub fn new() -> Self {
        Self::with_clock(Arc::new(date_utils::today))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            members: Vec::new(),
            children: Vec::new(),
            next_serial: 1,
            clock,
        }
    }

    pub fn sections(&self, kind: SectionKind) -> &[Section] {
        match kind {
            SectionKind::Member => &self.members,
            SectionKind::Child => &self.children,
        }
    }

    pub fn len(&self, kind: SectionKind) -> usize {
        self.sections(kind).len()
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections(id.kind).iter().find(|s| s.id == id)
    }

    fn sections_mut(&mut self, kind: SectionKind) -> &mut Vec<Section> {
        match kind {
            SectionKind::Member => &mut self.members,
            SectionKind::Child => &mut self.children,
        }
    }

    fn section_mut(&mut self, id: SectionId) -> Result<&mut Section, SectionError> {
        self.sections_mut(id.kind)
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SectionError::UnknownSection { kind: id.kind, id })
    }

    /// Append a new section, optionally pre-filled from a backend row.
    ///
    /// Columns not in the template are carried through to [`Section::to_data`].
    /// A stored child `Age` is recomputed from the date of birth. Gates are
    /// evaluated against the pre-filled selector values. A section without a
    /// stored id gets a temporary one until the backend assigns its own.
    pub fn add_section(&mut self, kind: SectionKind, initial: Option<&FieldMap>) -> SectionId {
        let id = SectionId {
            kind,
            serial: self.next_serial,
        };
        self.next_serial += 1;

        let mut section = Section::from_template(id);
        if let Some(data) = initial {
            prefill(&mut section, data);
        }
        let id_field = kind.template().id_field;
        if section.value(id_field).is_some_and(str::is_empty) {
            section.set_raw(id_field, temporary_id(kind));
        }
        section.apply_all_gates();
        if kind == SectionKind::Child
            && section.value(DATE_OF_BIRTH).is_some_and(|dob| !dob.is_empty())
        {
            section.recompute_age((self.clock)());
        }

        self.sections_mut(kind).push(section);
        self.reindex(kind);
        debug!(section = %id, count = self.len(kind), "Added section");
        id
    }

    /// Remove a section and renumber the rest.
    ///
    /// Removing the last Member section adds a fresh empty one.
    pub fn remove_section(&mut self, kind: SectionKind, id: SectionId) -> Result<(), SectionError> {
        let sections = self.sections_mut(kind);
        let position = sections
            .iter()
            .position(|s| s.id == id)
            .ok_or(SectionError::UnknownSection { kind, id })?;
        sections.remove(position);
        self.reindex(kind);
        debug!(section = %id, remaining = self.len(kind), "Removed section");

        if kind == SectionKind::Member && self.members.is_empty() {
            self.add_section(SectionKind::Member, None);
        }
        Ok(())
    }

    /// Write one field and recompute whatever depends on it
    pub fn set_field_value(
        &mut self,
        id: SectionId,
        field_name: &str,
        value: &str,
    ) -> Result<(), SectionError> {
        let today = (self.clock)();
        let section = self.section_mut(id)?;
        let template = section.template();
        let spec = template.field(field_name).ok_or_else(|| SectionError::UnknownField {
            kind: id.kind,
            field: field_name.to_string(),
        })?;

        let value = match spec.field_type {
            FieldType::Derived => return Err(SectionError::ReadOnlyField(spec.name)),
            FieldType::Select(options) => canonical_option(options, value).ok_or_else(|| {
                SectionError::InvalidOption {
                    field: spec.name,
                    value: value.to_string(),
                }
            })?,
            FieldType::Text | FieldType::Hidden | FieldType::Date => value.to_string(),
        };
        if let Some(gate) = template.gate_containing(spec.name) {
            if !section.group_visible(gate.group) {
                return Err(SectionError::HiddenField {
                    field: spec.name,
                    selector: gate.selector,
                });
            }
        }
        section.set_raw(spec.name, value);

        if let Some(gate) = template.gate_for_selector(spec.name) {
            section.apply_gate(gate);
        }
        if spec.name == DATE_OF_BIRTH {
            section.recompute_age(today);
        }
        Ok(())
    }

    /// Flatten every section in display order
    pub fn serialize(&self) -> SerializedSections {
        SerializedSections {
            members: self.members.iter().map(Section::to_data).collect(),
            children: self.children.iter().map(Section::to_data).collect(),
        }
    }

    /// Problems that block submission
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.members.is_empty() {
            issues.push(ValidationIssue::NoMembers);
        }
        for section in self.members.iter().chain(self.children.iter()) {
            for field in section.fields.iter() {
                if field.visible && field.required && field.value.trim().is_empty() {
                    issues.push(ValidationIssue::MissingRequiredField {
                        section: section.title(),
                        field: field.spec.name,
                    });
                }
            }
        }
        issues
    }

    /// Drop every section of both kinds
    pub fn clear(&mut self) {
        self.members.clear();
        self.children.clear();
    }

    /// Back to the state of a fresh form: one empty Member, no Children
    pub fn reset(&mut self) {
        self.clear();
        self.add_section(SectionKind::Member, None);
    }

    fn reindex(&mut self, kind: SectionKind) {
        for (position, section) in self.sections_mut(kind).iter_mut().enumerate() {
            section.index = position + 1;
        }
    }
}

/// Copy backend values into a freshly templated section
fn prefill(section: &mut Section, data: &FieldMap) {
    let id = section.id;
    for field in section.fields.iter_mut() {
        let spec = field.spec;
        let raw = data.get(spec.name).or_else(|| {
            // Older sheets store the birth date under `DOB`
            (spec.name == DATE_OF_BIRTH)
                .then(|| data.get(DOB_LEGACY))
                .flatten()
        });
        let Some(text) = raw.and_then(value_text) else {
            continue;
        };

        field.value = match spec.field_type {
            FieldType::Derived => continue,
            FieldType::Date => date_utils::normalize_date_input(&text),
            FieldType::Select(options) => match canonical_option(options, &text) {
                Some(option) => option,
                None => {
                    warn!(
                        section = %id,
                        field = spec.name,
                        value = %text,
                        "Dropping value that is not a valid option"
                    );
                    String::new()
                }
            },
            FieldType::Text | FieldType::Hidden => text,
        };
    }

    let template = id.kind.template();
    section.extra = data
        .iter()
        .filter(|(key, _)| template.field(key).is_none())
        .filter_map(|(key, value)| value_text(value).map(|text| (key.clone(), text)))
        .collect();
}

fn temporary_id(kind: SectionKind) -> String {
    format!("{}-{}", kind.template().temp_id_prefix, Uuid::new_v4())
}

/// Match a selector value against its options, ignoring case. Empty means unselected.
fn canonical_option(options: &[&str], value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(trimmed))
        .map(|option| option.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::section_templates::MEMBER_TEMPLATE;
    use crate::test_utils::fixed_clock;
    use serde_json::json;

    fn manager() -> DynamicSectionManager {
        DynamicSectionManager::with_clock(fixed_clock(2024, 6, 14))
    }

    fn indices(manager: &DynamicSectionManager, kind: SectionKind) -> Vec<usize> {
        manager.sections(kind).iter().map(Section::index).collect()
    }

    fn row(value: serde_json::Value) -> FieldMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_add_section_appends_and_numbers() {
        let mut manager = manager();
        let first = manager.add_section(SectionKind::Member, None);
        let second = manager.add_section(SectionKind::Member, None);
        let child = manager.add_section(SectionKind::Child, None);

        assert_eq!(indices(&manager, SectionKind::Member), vec![1, 2]);
        assert_eq!(indices(&manager, SectionKind::Child), vec![1]);
        assert_eq!(manager.section(second).unwrap().title(), "Member 2");
        assert_eq!(manager.section(child).unwrap().title(), "Child 1");
        assert_ne!(first, second);
        assert_eq!(manager.section(first).unwrap().value("First_Name"), Some(""));
    }

    #[test]
    fn test_reindex_after_removals() {
        let mut manager = manager();
        let ids: Vec<_> = (0..5)
            .map(|_| manager.add_section(SectionKind::Child, None))
            .collect();

        manager.remove_section(SectionKind::Child, ids[1]).unwrap();
        manager.remove_section(SectionKind::Child, ids[3]).unwrap();
        assert_eq!(indices(&manager, SectionKind::Child), vec![1, 2, 3]);

        let survivors: Vec<_> = manager
            .sections(SectionKind::Child)
            .iter()
            .map(Section::id)
            .collect();
        assert_eq!(survivors, vec![ids[0], ids[2], ids[4]]);

        manager.add_section(SectionKind::Child, None);
        assert_eq!(indices(&manager, SectionKind::Child), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_removing_last_member_leaves_one_empty_member() {
        let mut manager = manager();
        let only = manager.add_section(SectionKind::Member, None);
        manager.set_field_value(only, "First_Name", "Jane").unwrap();

        manager.remove_section(SectionKind::Member, only).unwrap();

        let members = manager.sections(SectionKind::Member);
        assert_eq!(members.len(), 1);
        assert_ne!(members[0].id(), only);
        assert_eq!(members[0].index(), 1);
        assert!(members[0]
            .fields()
            .iter()
            .filter(|f| f.name() != "Member_ID")
            .all(|f| f.value.is_empty()));
    }

    #[test]
    fn test_removing_last_child_leaves_none() {
        let mut manager = manager();
        let child = manager.add_section(SectionKind::Child, None);
        manager.remove_section(SectionKind::Child, child).unwrap();
        assert_eq!(manager.len(SectionKind::Child), 0);
    }

    #[test]
    fn test_remove_unknown_or_wrong_kind() {
        let mut manager = manager();
        let member = manager.add_section(SectionKind::Member, None);
        let err = manager.remove_section(SectionKind::Child, member).unwrap_err();
        assert!(matches!(err, SectionError::UnknownSection { .. }));

        manager.remove_section(SectionKind::Member, member).unwrap();
        let err = manager.remove_section(SectionKind::Member, member).unwrap_err();
        assert!(matches!(err, SectionError::UnknownSection { .. }));
    }

    #[test]
    fn test_gate_toggle_clears_and_does_not_resurrect() {
        let mut manager = manager();
        let id = manager.add_section(SectionKind::Member, None);

        assert!(!manager.section(id).unwrap().group_visible("baptism"));

        manager.set_field_value(id, "Baptism_YN", "Yes").unwrap();
        let section = manager.section(id).unwrap();
        assert!(section.group_visible("baptism"));
        assert!(section.field("Baptism_Date").unwrap().required);
        assert!(section.field("Baptism_Church").unwrap().required);

        manager.set_field_value(id, "Baptism_Date", "2001-04-15").unwrap();
        manager.set_field_value(id, "Baptism_Church", "St Mary").unwrap();

        manager.set_field_value(id, "Baptism_YN", "No").unwrap();
        let section = manager.section(id).unwrap();
        assert!(!section.group_visible("baptism"));
        assert_eq!(section.value("Baptism_Date"), Some(""));
        assert_eq!(section.value("Baptism_Church"), Some(""));
        assert!(!section.field("Baptism_Date").unwrap().required);

        manager.set_field_value(id, "Baptism_YN", "Yes").unwrap();
        let section = manager.section(id).unwrap();
        assert!(section.group_visible("baptism"));
        assert_eq!(section.value("Baptism_Date"), Some(""));
        assert_eq!(section.value("Baptism_Church"), Some(""));
    }

    #[test]
    fn test_hidden_group_rejects_writes() {
        let mut manager = manager();
        let id = manager.add_section(SectionKind::Member, None);

        assert_eq!(
            manager.set_field_value(id, "Baptism_Date", "2001-04-15"),
            Err(SectionError::HiddenField {
                field: "Baptism_Date",
                selector: "Baptism_YN",
            })
        );

        manager.set_field_value(id, "Baptism_YN", "No").unwrap();
        assert!(matches!(
            manager.set_field_value(id, "Baptism_Date", "2001-04-15"),
            Err(SectionError::HiddenField { .. })
        ));
        let section = manager.section(id).unwrap();
        assert!(!section.group_visible("baptism"));
        assert_eq!(section.value("Baptism_Date"), Some(""));
        assert_eq!(manager.serialize().members[0]["Baptism_Date"], "");

        manager.set_field_value(id, "Baptism_YN", "Yes").unwrap();
        manager.set_field_value(id, "Baptism_Date", "2001-04-15").unwrap();
        assert_eq!(manager.serialize().members[0]["Baptism_Date"], "2001-04-15");
    }

    #[test]
    fn test_marital_status_gate() {
        let mut manager = manager();
        let id = manager.add_section(SectionKind::Member, None);

        manager.set_field_value(id, "Marital_Status", "Married").unwrap();
        assert!(manager.section(id).unwrap().group_visible("marriage"));
        manager.set_field_value(id, "Marriage_Church", "Cathedral").unwrap();

        manager.set_field_value(id, "Marital_Status", "Single").unwrap();
        let section = manager.section(id).unwrap();
        assert!(!section.group_visible("marriage"));
        assert_eq!(section.value("Marriage_Church"), Some(""));
    }

    #[test]
    fn test_prefilled_yes_reveals_group() {
        let mut manager = manager();
        let data = row(json!({
            "Member_ID": "MEM-7",
            "First_Name": "Jane",
            "Baptism_YN": "yes",
            "Baptism_Date": "2001-04-15T00:00:00.000Z",
            "Baptism_Church": "St Mary",
            "Confirmation_YN": "No",
            "Confirmation_Church": "stale value",
            "Timestamp": "2024-01-01T10:00:00Z"
        }));
        let id = manager.add_section(SectionKind::Member, Some(&data));
        let section = manager.section(id).unwrap();

        assert_eq!(section.value("Member_ID"), Some("MEM-7"));
        assert_eq!(section.value("Baptism_YN"), Some("Yes"));
        assert!(section.group_visible("baptism"));
        assert_eq!(section.value("Baptism_Date"), Some("2001-04-15"));
        assert!(!section.group_visible("confirmation"));
        assert_eq!(section.value("Confirmation_Church"), Some(""));
        assert!(section.field("Timestamp").is_none());
        assert_eq!(
            section.extra().get("Timestamp").map(String::as_str),
            Some("2024-01-01T10:00:00Z")
        );
    }

    #[test]
    fn test_new_sections_get_temporary_ids() {
        let mut manager = manager();
        let first = manager.add_section(SectionKind::Member, None);
        let second = manager.add_section(SectionKind::Member, None);
        let child = manager.add_section(SectionKind::Child, None);
        let blank_id = row(json!({"Member_ID": "", "First_Name": "Sipho"}));
        let stored_blank = manager.add_section(SectionKind::Member, Some(&blank_id));
        let stored_data = row(json!({"Member_ID": "MEM-7"}));
        let stored = manager.add_section(SectionKind::Member, Some(&stored_data));

        let id_of = |id: SectionId, field: &str| {
            manager.section(id).unwrap().value(field).unwrap().to_string()
        };
        assert!(id_of(first, "Member_ID").starts_with("MEM-"));
        assert!(id_of(stored_blank, "Member_ID").starts_with("MEM-"));
        assert!(id_of(child, "Child_ID").starts_with("CHD-"));
        assert_ne!(id_of(first, "Member_ID"), id_of(second, "Member_ID"));
        assert_eq!(id_of(stored, "Member_ID"), "MEM-7");

        let out = manager.serialize();
        assert!(out.members.iter().all(|m| !m["Member_ID"].is_empty()));
        assert!(out.children[0]["Child_ID"].starts_with("CHD-"));
    }

    #[test]
    fn test_unknown_columns_survive_serialization() {
        let mut manager = manager();
        let data = row(json!({
            "Member_ID": "MEM-1",
            "Full_Name": "Jane Doe",
            "Sacraments": "Baptism",
            "Notes": null,
            "Age": 41
        }));
        let id = manager.add_section(SectionKind::Member, Some(&data));
        manager.set_field_value(id, "Occupation", "Nurse").unwrap();

        let out = &manager.serialize().members[0];
        assert_eq!(out["Full_Name"], "Jane Doe");
        assert_eq!(out["Sacraments"], "Baptism");
        assert_eq!(out["Age"], "41");
        assert_eq!(out["Occupation"], "Nurse");
        assert!(!out.contains_key("Notes"));
    }

    #[test]
    fn test_legacy_dob_column_follows_edits() {
        let mut manager = manager();
        let data = row(json!({"DOB": "2014-01-02"}));
        let id = manager.add_section(SectionKind::Child, Some(&data));
        manager.set_field_value(id, "Date_of_Birth", "2015-03-04").unwrap();

        let out = &manager.serialize().children[0];
        assert_eq!(out["Date_of_Birth"], "2015-03-04");
        assert_eq!(out["DOB"], "2015-03-04");
        assert_eq!(out["Age"], "9");
    }

    #[test]
    fn test_prefill_drops_unknown_option() {
        let mut manager = manager();
        let data = row(json!({"Gender": "Unknown", "Last_Name": "Doe"}));
        let id = manager.add_section(SectionKind::Member, Some(&data));
        let section = manager.section(id).unwrap();
        assert_eq!(section.value("Gender"), Some(""));
        assert_eq!(section.value("Last_Name"), Some("Doe"));
    }

    #[test]
    fn test_child_age_computed_on_add() {
        let mut manager = manager();
        let data = row(json!({"First_Name": "Tumi", "Date_of_Birth": "2020-06-15", "Age": 99}));
        let id = manager.add_section(SectionKind::Child, Some(&data));
        assert_eq!(manager.section(id).unwrap().value("Age"), Some("3"));
    }

    #[test]
    fn test_child_age_from_legacy_dob_column() {
        let mut manager = manager();
        let data = row(json!({"DOB": "2014-01-02"}));
        let id = manager.add_section(SectionKind::Child, Some(&data));
        let section = manager.section(id).unwrap();
        assert_eq!(section.value("Date_of_Birth"), Some("2014-01-02"));
        assert_eq!(section.value("Age"), Some("10"));
    }

    #[test]
    fn test_child_without_dob_has_empty_age() {
        let mut manager = manager();
        let id = manager.add_section(SectionKind::Child, None);
        assert_eq!(manager.section(id).unwrap().value("Age"), Some(""));
    }

    #[test]
    fn test_age_follows_date_of_birth() {
        let mut manager = DynamicSectionManager::with_clock(fixed_clock(2024, 6, 15));
        let id = manager.add_section(SectionKind::Child, None);

        manager.set_field_value(id, "Date_of_Birth", "2020-06-15").unwrap();
        assert_eq!(manager.section(id).unwrap().value("Age"), Some("4"));

        manager.set_field_value(id, "Date_of_Birth", "2020-06-16").unwrap();
        assert_eq!(manager.section(id).unwrap().value("Age"), Some("3"));

        manager.set_field_value(id, "Date_of_Birth", "not a date").unwrap();
        assert_eq!(manager.section(id).unwrap().value("Age"), Some("Invalid Date"));

        manager.set_field_value(id, "Date_of_Birth", "").unwrap();
        assert_eq!(manager.section(id).unwrap().value("Age"), Some("Invalid Date"));

        manager.set_field_value(id, "Date_of_Birth", "2030-01-01").unwrap();
        assert_eq!(manager.section(id).unwrap().value("Age"), Some("Invalid DOB"));
    }

    #[test]
    fn test_member_dob_does_not_create_age() {
        let mut manager = manager();
        let id = manager.add_section(SectionKind::Member, None);
        manager.set_field_value(id, "Date_of_Birth", "1980-01-01").unwrap();
        assert!(manager.section(id).unwrap().field("Age").is_none());
    }

    #[test]
    fn test_set_field_rejections() {
        let mut manager = manager();
        let child = manager.add_section(SectionKind::Child, None);

        assert_eq!(
            manager.set_field_value(child, "Age", "5"),
            Err(SectionError::ReadOnlyField("Age"))
        );
        assert!(matches!(
            manager.set_field_value(child, "Marital_Status", "Married"),
            Err(SectionError::UnknownField { .. })
        ));
        assert!(matches!(
            manager.set_field_value(child, "Baptism_YN", "Maybe"),
            Err(SectionError::InvalidOption { field: "Baptism_YN", .. })
        ));

        manager.remove_section(SectionKind::Child, child).unwrap();
        assert!(matches!(
            manager.set_field_value(child, "First_Name", "Ghost"),
            Err(SectionError::UnknownSection { .. })
        ));
    }

    #[test]
    fn test_serialize_in_display_order() {
        let mut manager = manager();
        let a = manager.add_section(SectionKind::Member, None);
        let b = manager.add_section(SectionKind::Member, None);
        let c = manager.add_section(SectionKind::Member, None);
        manager.set_field_value(a, "First_Name", "A").unwrap();
        manager.set_field_value(b, "First_Name", "B").unwrap();
        manager.set_field_value(c, "First_Name", "C").unwrap();
        manager.remove_section(SectionKind::Member, b).unwrap();

        let child = manager.add_section(SectionKind::Child, None);
        manager.set_field_value(child, "Date_of_Birth", "2019-01-01").unwrap();
        manager.set_field_value(child, "Baptism_YN", "No").unwrap();

        let out = manager.serialize();
        let names: Vec<_> = out.members.iter().map(|m| m["First_Name"].as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(out.children.len(), 1);
        assert_eq!(out.children[0]["Age"], "5");
        assert_eq!(out.children[0]["Baptism_Date"], "");
        assert_eq!(out.members[0].len(), MEMBER_TEMPLATE.fields.len());
        assert!(out.members[0]["Member_ID"].starts_with("MEM-"));
    }

    #[test]
    fn test_validate_reports_required_gated_fields() {
        let mut manager = manager();
        assert_eq!(manager.validate(), vec![ValidationIssue::NoMembers]);

        let id = manager.add_section(SectionKind::Member, None);
        assert!(manager.validate().is_empty());

        manager.set_field_value(id, "Dikabelo_YN", "Yes").unwrap();
        assert_eq!(
            manager.validate(),
            vec![ValidationIssue::MissingRequiredField {
                section: "Member 1".to_string(),
                field: "Dikabelo_Card_No",
            }]
        );

        manager.set_field_value(id, "Dikabelo_Card_No", "D-112").unwrap();
        assert!(manager.validate().is_empty());
    }

    #[test]
    fn test_reset_restores_single_member() {
        let mut manager = manager();
        manager.add_section(SectionKind::Member, None);
        manager.add_section(SectionKind::Member, None);
        manager.add_section(SectionKind::Child, None);

        manager.reset();
        assert_eq!(manager.len(SectionKind::Member), 1);
        assert_eq!(manager.len(SectionKind::Child), 0);
        assert_eq!(indices(&manager, SectionKind::Member), vec![1]);
    }
}
