use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A raw spreadsheet row: column name -> cell value as delivered by the backend
pub type FieldMap = BTreeMap<String, Value>;

/// A form section flattened for submission: field name -> entered text
pub type SectionData = BTreeMap<String, String>;

/// Column names used by the census spreadsheet
pub mod field {
    pub const HOUSEHOLD_ID: &str = "Household_ID";
    pub const MEMBER_ID: &str = "Member_ID";
    pub const CHILD_ID: &str = "Child_ID";
    pub const BLOCK_NAME: &str = "Block_Name";
    pub const RESIDENTIAL_ADDRESS: &str = "Residential_Address";
    pub const CONTACT_NO: &str = "Contact_No";
    pub const FIRST_NAME: &str = "First_Name";
    pub const LAST_NAME: &str = "Last_Name";
    pub const FULL_NAME: &str = "Full_Name";
    pub const GENDER: &str = "Gender";
    pub const DATE_OF_BIRTH: &str = "Date_of_Birth";
    /// Older sheet layouts used `DOB` instead of `Date_of_Birth`
    pub const DOB_LEGACY: &str = "DOB";
    pub const AGE: &str = "Age";
    pub const TIMESTAMP: &str = "Timestamp";
}

/// Project a cell value to text.
///
/// Strings are returned as-is, numbers and booleans are formatted. `null`,
/// arrays and objects have no text projection.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Shared read access for the three census entities
pub trait CensusEntity {
    fn fields(&self) -> &FieldMap;

    /// Text value of a column, `None` when the column is absent or has no text projection
    fn field_text(&self, key: &str) -> Option<String> {
        self.fields().get(key).and_then(value_text)
    }

    /// "First Last" when either part is present, otherwise `Full_Name`
    fn display_name(&self) -> String {
        let first = self.field_text(field::FIRST_NAME).unwrap_or_default();
        let last = self.field_text(field::LAST_NAME).unwrap_or_default();
        let joined = format!("{} {}", first.trim(), last.trim()).trim().to_string();
        if joined.is_empty() {
            self.field_text(field::FULL_NAME).unwrap_or_default().trim().to_string()
        } else {
            joined
        }
    }

    /// Date of birth, accepting the legacy `DOB` column
    fn date_of_birth(&self) -> Option<String> {
        self.field_text(field::DATE_OF_BIRTH)
            .or_else(|| self.field_text(field::DOB_LEGACY))
    }
}

/// The top-level census unit, one per residence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Household {
    pub fields: FieldMap,
}

/// An adult occupant of a household
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Member {
    pub fields: FieldMap,
}

/// A minor occupant of a household. `Age` is derived from `Date_of_Birth`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Child {
    pub fields: FieldMap,
}

impl CensusEntity for Household {
    fn fields(&self) -> &FieldMap {
        &self.fields
    }
}

impl CensusEntity for Member {
    fn fields(&self) -> &FieldMap {
        &self.fields
    }
}

impl CensusEntity for Child {
    fn fields(&self) -> &FieldMap {
        &self.fields
    }
}

impl Household {
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self { fields: collect_fields(fields) }
    }

    pub fn household_id(&self) -> Option<String> {
        self.field_text(field::HOUSEHOLD_ID)
    }
}

impl Member {
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self { fields: collect_fields(fields) }
    }
}

impl Child {
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self { fields: collect_fields(fields) }
    }
}

fn collect_fields<I, K, V>(fields: I) -> FieldMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// One household with its members and children, as listed by the backend.
///
/// Every part is optional because the upstream spreadsheet is not under our
/// control. A record missing any part is malformed: it is kept so the list
/// still shows it, but it never matches a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Household", default, skip_serializing_if = "Option::is_none")]
    pub household: Option<Household>,
    #[serde(rename = "Members", default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
    #[serde(rename = "Children", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Child>>,
}

/// Borrowed view of a well-formed record
#[derive(Debug, Clone, Copy)]
pub struct RecordParts<'a> {
    pub household: &'a Household,
    pub members: &'a [Member],
    pub children: &'a [Child],
}

impl Record {
    pub fn new(household: Household, members: Vec<Member>, children: Vec<Child>) -> Self {
        Self {
            household: Some(household),
            members: Some(members),
            children: Some(children),
        }
    }

    /// Build a record from an untrusted JSON value.
    ///
    /// Returns `None` when the value is not an object at all. Parts that are
    /// missing or have the wrong shape become `None`, which marks the record
    /// as malformed instead of failing the whole listing.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let household = map
            .remove("Household")
            .and_then(|v| serde_json::from_value::<Household>(v).ok());
        let members = map
            .remove("Members")
            .and_then(|v| serde_json::from_value::<Vec<Member>>(v).ok());
        let children = map
            .remove("Children")
            .and_then(|v| serde_json::from_value::<Vec<Child>>(v).ok());
        Some(Self {
            household,
            members,
            children,
        })
    }

    pub fn parts(&self) -> Option<RecordParts<'_>> {
        match (&self.household, &self.members, &self.children) {
            (Some(household), Some(members), Some(children)) => Some(RecordParts {
                household,
                members,
                children,
            }),
            _ => None,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.parts().is_some()
    }

    pub fn household_id(&self) -> Option<String> {
        self.household.as_ref().and_then(Household::household_id)
    }

    /// Text value of a household column, empty when absent
    pub fn household_text(&self, key: &str) -> String {
        self.household
            .as_ref()
            .and_then(|h| h.field_text(key))
            .unwrap_or_default()
    }

    pub fn member_count(&self) -> usize {
        self.members.as_ref().map_or(0, Vec::len)
    }

    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, Vec::len)
    }
}

/// Counters shown at the top of the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusSummary {
    #[serde(default)]
    pub households: u64,
    #[serde(default)]
    pub members: u64,
    #[serde(default)]
    pub children: u64,
}

impl CensusSummary {
    /// Count what is loaded locally, used when the summary endpoint fails
    pub fn from_records(records: &[Record]) -> Self {
        Self {
            households: records.len() as u64,
            members: records.iter().map(|r| r.member_count() as u64).sum(),
            children: records.iter().map(|r| r.child_count() as u64).sum(),
        }
    }
}

/// Command understood by the census script endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CensusCommand {
    #[serde(rename = "SUBMIT_NEW")]
    SubmitNew,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl fmt::Display for CensusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CensusCommand::SubmitNew => write!(f, "SUBMIT_NEW"),
            CensusCommand::Update => write!(f, "UPDATE"),
            CensusCommand::Delete => write!(f, "DELETE"),
        }
    }
}

/// Household, members and children as entered in the census form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusSubmission {
    pub household: SectionData,
    pub members: Vec<SectionData>,
    pub children: Vec<SectionData>,
}

/// Body of every POST sent to the census endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: CensusCommand,
    #[serde(rename = "householdId", default, skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household: Option<SectionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<SectionData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SectionData>>,
}

impl CommandRequest {
    pub fn submit_new(submission: CensusSubmission) -> Self {
        Self {
            command: CensusCommand::SubmitNew,
            household_id: None,
            household: Some(submission.household),
            members: Some(submission.members),
            children: Some(submission.children),
        }
    }

    pub fn update(household_id: &str, submission: CensusSubmission) -> Self {
        Self {
            command: CensusCommand::Update,
            household_id: Some(household_id.to_string()),
            household: Some(submission.household),
            members: Some(submission.members),
            children: Some(submission.children),
        }
    }

    pub fn delete(household_id: &str) -> Self {
        Self {
            command: CensusCommand::Delete,
            household_id: Some(household_id.to_string()),
            household: None,
            members: None,
            children: None,
        }
    }
}

/// Status envelope returned by the census endpoint.
///
/// The script is inconsistent about casing (`SUCCESS` vs `success`) and
/// sometimes reports failures through an `error` field instead of `status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "householdId", default, skip_serializing_if = "Option::is_none")]
    pub household_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Value>>,
}

impl ApiEnvelope {
    pub fn success(message: &str) -> Self {
        Self {
            status: Some("SUCCESS".to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            status: Some("ERROR".to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("success"))
    }

    /// Best available description of a failed call
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Unknown error from census service".to_string())
    }

    pub fn household_id_text(&self) -> Option<String> {
        self.household_id.as_ref().and_then(value_text)
    }
}
