//! Test utilities shared by the unit tests of every module
//!
//! Provides record fixtures, a fixed clock, an in-memory [`FakeBackend`] and
//! a throwaway HTTP server for exercising the real client.

use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDate;
use shared::{
    CensusSubmission, CensusSummary, Child, CommandRequest, Household, Member, Record, SectionData,
};
use std::sync::{Arc, Mutex};

use crate::errors::CensusError;
use crate::services::api::CensusBackend;
use crate::state::Clock;

/// Clock that always returns the given date
pub fn fixed_clock(year: i32, month: u32, day: u32) -> Clock {
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
    Arc::new(move || date)
}

pub fn household(id: &str, block: &str, address: &str) -> Household {
    Household::from_fields([
        ("Household_ID", id),
        ("Block_Name", block),
        ("Residential_Address", address),
    ])
}

pub fn member(first: &str, last: &str) -> Member {
    Member::from_fields([("First_Name", first), ("Last_Name", last)])
}

pub fn child(first: &str, last: &str, dob: &str) -> Child {
    Child::from_fields([
        ("First_Name", first),
        ("Last_Name", last),
        ("Date_of_Birth", dob),
    ])
}

fn person(first: &str, last: &str, gender: &str, dob: &str) -> [(&'static str, String); 4] {
    [
        ("First_Name", first.to_string()),
        ("Last_Name", last.to_string()),
        ("Gender", gender.to_string()),
        ("Date_of_Birth", dob.to_string()),
    ]
}

/// Three well-formed households:
///
/// - HH-1, Block A: Jane Doe (Female) and John Doe (Male)
/// - HH-2, Block B, Molapo Crossing: Peter Smith
/// - HH-3, Block C: Thabo Nkosi with child Kabelo Nkosi (born 2016-05-05)
pub fn sample_records() -> Vec<Record> {
    vec![
        Record::new(
            household("HH-1", "Block A", "1 First St"),
            vec![
                Member::from_fields(person("Jane", "Doe", "Female", "1985-03-12")),
                Member::from_fields(person("John", "Doe", "Male", "1983-11-02")),
            ],
            vec![],
        ),
        Record::new(
            household("HH-2", "Block B", "Molapo Crossing"),
            vec![Member::from_fields(person("Peter", "Smith", "Male", "1970-01-20"))],
            vec![],
        ),
        Record::new(
            household("HH-3", "Block C", "3 Third St"),
            vec![Member::from_fields(person("Thabo", "Nkosi", "Male", "1990-07-07"))],
            vec![Child::from_fields(person("Kabelo", "Nkosi", "Male", "2016-05-05"))],
        ),
    ]
}

fn section_data(pairs: &[(&str, &str)]) -> SectionData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Minimal valid submission: one household in Block A with Jane Doe
pub fn sample_submission() -> CensusSubmission {
    CensusSubmission {
        household: section_data(&[("Household_ID", ""), ("Block_Name", "Block A")]),
        members: vec![section_data(&[("First_Name", "Jane"), ("Last_Name", "Doe")])],
        children: vec![],
    }
}

/// Serve `app` on an ephemeral local port and return its `/exec` URL
pub async fn spawn_stub_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/exec", addr)
}

#[derive(Default)]
struct FakeState {
    records: Vec<Record>,
    next_id: usize,
    offline: bool,
    summary_unavailable: bool,
    calls: Vec<String>,
    commands: Vec<CommandRequest>,
}

/// In-memory census store with switchable failures
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        let next_id = records.len() + 1;
        Self {
            state: Mutex::new(FakeState {
                records,
                next_id,
                ..FakeState::default()
            }),
        }
    }

    /// Every call fails with a transport error while offline
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn set_summary_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().summary_unavailable = unavailable;
    }

    /// Names of the operations called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last_command(&self) -> Option<CommandRequest> {
        self.state.lock().unwrap().commands.last().cloned()
    }

    pub fn record(&self, household_id: &str) -> Option<Record> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.household_id().as_deref() == Some(household_id))
            .cloned()
    }

    fn begin(&self, call: &str) -> Result<std::sync::MutexGuard<'_, FakeState>, CensusError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        if state.offline {
            return Err(CensusError::Transport("connection refused".to_string()));
        }
        Ok(state)
    }
}

fn not_found(household_id: &str) -> CensusError {
    CensusError::application(format!("Household {} not found", household_id))
}

fn record_from_submission(household_id: &str, submission: &CensusSubmission) -> Record {
    let mut household = Household::from_fields(submission.household.clone());
    household
        .fields
        .insert("Household_ID".to_string(), household_id.into());
    Record::new(
        household,
        submission
            .members
            .iter()
            .map(|m| Member::from_fields(m.clone()))
            .collect(),
        submission
            .children
            .iter()
            .map(|c| Child::from_fields(c.clone()))
            .collect(),
    )
}

#[async_trait]
impl CensusBackend for FakeBackend {
    async fn list_records(&self) -> Result<Vec<Record>, CensusError> {
        let state = self.begin("list_records")?;
        Ok(state.records.clone())
    }

    async fn fetch_record(&self, household_id: &str) -> Result<Option<Record>, CensusError> {
        let state = self.begin("fetch_record")?;
        Ok(state
            .records
            .iter()
            .find(|r| r.household_id().as_deref() == Some(household_id))
            .cloned())
    }

    async fn fetch_summary(&self) -> Result<CensusSummary, CensusError> {
        let state = self.begin("fetch_summary")?;
        if state.summary_unavailable {
            return Err(CensusError::Transport("summary timed out".to_string()));
        }
        Ok(CensusSummary::from_records(&state.records))
    }

    async fn create_record(&self, submission: CensusSubmission) -> Result<String, CensusError> {
        let mut state = self.begin("create_record")?;
        let household_id = format!("HH-{}", state.next_id);
        state.next_id += 1;
        state.commands.push(CommandRequest::submit_new(submission.clone()));
        state
            .records
            .push(record_from_submission(&household_id, &submission));
        Ok(household_id)
    }

    async fn update_record(
        &self,
        household_id: &str,
        submission: CensusSubmission,
    ) -> Result<(), CensusError> {
        let mut state = self.begin("update_record")?;
        state
            .commands
            .push(CommandRequest::update(household_id, submission.clone()));
        let position = state
            .records
            .iter()
            .position(|r| r.household_id().as_deref() == Some(household_id))
            .ok_or_else(|| not_found(household_id))?;
        state.records[position] = record_from_submission(household_id, &submission);
        Ok(())
    }

    async fn delete_record(&self, household_id: &str) -> Result<(), CensusError> {
        let mut state = self.begin("delete_record")?;
        state.commands.push(CommandRequest::delete(household_id));
        let position = state
            .records
            .iter()
            .position(|r| r.household_id().as_deref() == Some(household_id))
            .ok_or_else(|| not_found(household_id))?;
        state.records.remove(position);
        Ok(())
    }
}
