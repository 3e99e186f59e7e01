//! # Section Templates
//!
//! Fixed field layouts for the repeatable Member and Child sections of the
//! census form, including the gated sub-groups (sacraments, marriage,
//! Dikabelo contributions) whose fields only apply when their selector is in
//! an active state.

use std::fmt;

const YES_NO: &[&str] = &["Yes", "No"];
const GENDERS: &[&str] = &["Male", "Female"];
const MARITAL_STATUSES: &[&str] = &["Single", "Married", "Widowed", "Divorced"];

/// Which repeatable collection a section belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Member,
    Child,
}

impl SectionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Member => "Member",
            SectionKind::Child => "Child",
        }
    }

    pub fn template(&self) -> &'static SectionTemplate {
        match self {
            SectionKind::Member => &MEMBER_TEMPLATE,
            SectionKind::Child => &CHILD_TEMPLATE,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Input type of a template field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// Identifier carried through edits but never shown for input
    Hidden,
    /// `YYYY-MM-DD`
    Date,
    /// Single choice from a fixed list; empty means unselected
    Select(&'static [&'static str]),
    /// Computed by the manager, never written by the user
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec { name, field_type: FieldType::Text }
}

const fn hidden(name: &'static str) -> FieldSpec {
    FieldSpec { name, field_type: FieldType::Hidden }
}

const fn date(name: &'static str) -> FieldSpec {
    FieldSpec { name, field_type: FieldType::Date }
}

const fn select(name: &'static str, options: &'static [&'static str]) -> FieldSpec {
    FieldSpec { name, field_type: FieldType::Select(options) }
}

const fn derived(name: &'static str) -> FieldSpec {
    FieldSpec { name, field_type: FieldType::Derived }
}

/// A sub-group of fields whose relevance is controlled by one selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSpec {
    pub group: &'static str,
    pub selector: &'static str,
    /// Selector values that make the group visible
    pub active_values: &'static [&'static str],
    pub fields: &'static [&'static str],
    /// Fields that must be filled while the group is visible
    pub required: &'static [&'static str],
}

impl GateSpec {
    pub fn is_active(&self, selector_value: &str) -> bool {
        self.active_values.iter().any(|v| *v == selector_value)
    }
}

/// Ordered field layout of one section kind
#[derive(Debug)]
pub struct SectionTemplate {
    pub kind: SectionKind,
    pub id_field: &'static str,
    /// Prefix of client-side ids given to sections not yet stored
    pub temp_id_prefix: &'static str,
    pub fields: &'static [FieldSpec],
    pub gates: &'static [GateSpec],
}

impl SectionTemplate {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn gate_for_selector(&self, selector: &str) -> Option<&'static GateSpec> {
        self.gates.iter().find(|gate| gate.selector == selector)
    }

    /// The gate whose sub-group contains `field`, if any
    pub fn gate_containing(&self, field: &str) -> Option<&'static GateSpec> {
        self.gates
            .iter()
            .find(|gate| gate.fields.iter().any(|f| *f == field))
    }
}

const BAPTISM: GateSpec = GateSpec {
    group: "baptism",
    selector: "Baptism_YN",
    active_values: &["Yes"],
    fields: &["Baptism_Date", "Baptism_Church"],
    required: &["Baptism_Date", "Baptism_Church"],
};

const CONFIRMATION: GateSpec = GateSpec {
    group: "confirmation",
    selector: "Confirmation_YN",
    active_values: &["Yes"],
    fields: &["Confirmation_Date", "Confirmation_Church"],
    required: &["Confirmation_Date", "Confirmation_Church"],
};

const FIRST_COMMUNION: GateSpec = GateSpec {
    group: "first-communion",
    selector: "First_Communion_YN",
    active_values: &["Yes"],
    fields: &["First_Communion_Date", "First_Communion_Church"],
    required: &["First_Communion_Date", "First_Communion_Church"],
};

const MARRIAGE: GateSpec = GateSpec {
    group: "marriage",
    selector: "Marital_Status",
    active_values: &["Married", "Widowed"],
    fields: &["Marriage_Date", "Marriage_Church"],
    required: &["Marriage_Date", "Marriage_Church"],
};

const DIKABELO: GateSpec = GateSpec {
    group: "dikabelo",
    selector: "Dikabelo_YN",
    active_values: &["Yes"],
    fields: &["Dikabelo_Card_No"],
    required: &["Dikabelo_Card_No"],
};

pub static MEMBER_TEMPLATE: SectionTemplate = SectionTemplate {
    kind: SectionKind::Member,
    id_field: "Member_ID",
    temp_id_prefix: "MEM",
    fields: &[
        hidden("Member_ID"),
        text("First_Name"),
        text("Last_Name"),
        select("Gender", GENDERS),
        date("Date_of_Birth"),
        text("Occupation"),
        text("Contact_No"),
        select("Baptism_YN", YES_NO),
        date("Baptism_Date"),
        text("Baptism_Church"),
        select("Confirmation_YN", YES_NO),
        date("Confirmation_Date"),
        text("Confirmation_Church"),
        select("First_Communion_YN", YES_NO),
        date("First_Communion_Date"),
        text("First_Communion_Church"),
        select("Marital_Status", MARITAL_STATUSES),
        date("Marriage_Date"),
        text("Marriage_Church"),
        select("Dikabelo_YN", YES_NO),
        text("Dikabelo_Card_No"),
    ],
    gates: &[BAPTISM, CONFIRMATION, FIRST_COMMUNION, MARRIAGE, DIKABELO],
};

pub static CHILD_TEMPLATE: SectionTemplate = SectionTemplate {
    kind: SectionKind::Child,
    id_field: "Child_ID",
    temp_id_prefix: "CHD",
    fields: &[
        hidden("Child_ID"),
        text("First_Name"),
        text("Last_Name"),
        select("Gender", GENDERS),
        date("Date_of_Birth"),
        derived("Age"),
        text("School"),
        select("Baptism_YN", YES_NO),
        date("Baptism_Date"),
        text("Baptism_Church"),
        select("First_Communion_YN", YES_NO),
        date("First_Communion_Date"),
        text("First_Communion_Church"),
    ],
    gates: &[BAPTISM, FIRST_COMMUNION],
};
