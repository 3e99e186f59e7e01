//! # Census API Client
//!
//! Talks to the census script endpoint over HTTP + JSON using [`reqwest`].
//!
//! ## Operations
//!
//! | Operation | Request |
//! |---|---|
//! | list | `GET ?action=fetchRecords` |
//! | fetch one | `GET ?action=getRecordById&id=<id>` |
//! | summary | `GET ?action=summary` |
//! | create / update / delete | `POST {command: SUBMIT_NEW \| UPDATE \| DELETE, ...}` |
//!
//! GET requests are retried with exponential backoff on transport failures.
//! POST requests are sent exactly once.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use shared::{ApiEnvelope, CensusSubmission, CensusSummary, CommandRequest, Record};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{CensusConfig, RetryConfig};
use crate::errors::CensusError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Record store behind the admin dashboard and the census form
#[async_trait]
pub trait CensusBackend: Send + Sync {
    /// Every household with its members and children
    async fn list_records(&self) -> Result<Vec<Record>, CensusError>;

    /// One household, `None` when the store does not know the id
    async fn fetch_record(&self, household_id: &str) -> Result<Option<Record>, CensusError>;

    async fn fetch_summary(&self) -> Result<CensusSummary, CensusError>;

    /// Store a new household and return the id the store assigned
    async fn create_record(&self, submission: CensusSubmission) -> Result<String, CensusError>;

    async fn update_record(
        &self,
        household_id: &str,
        submission: CensusSubmission,
    ) -> Result<(), CensusError>;

    async fn delete_record(&self, household_id: &str) -> Result<(), CensusError>;
}

/// HTTP client for one deployed census script
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryConfig,
}

/// Status and parsed body of one HTTP exchange
#[derive(Debug)]
struct Reply {
    status: StatusCode,
    /// `None` when the body was empty or not JSON
    body: Option<Value>,
}

impl ApiClient {
    /// Client with default timeout and retry settings
    pub fn new(endpoint: String) -> Result<Self, CensusError> {
        let client = build_http_client(DEFAULT_TIMEOUT)?;
        Ok(Self::with_client(client, endpoint, RetryConfig::default()))
    }

    pub fn from_config(config: &CensusConfig) -> Result<Self, CensusError> {
        let client = build_http_client(config.request_timeout())?;
        Ok(Self::with_client(
            client,
            config.api_endpoint.trim().to_string(),
            config.retry.clone(),
        ))
    }

    /// Reuse an existing [`reqwest::Client`], e.g. one with custom timeouts
    pub fn with_client(client: reqwest::Client, endpoint: String, retry: RetryConfig) -> Self {
        Self {
            client,
            endpoint,
            retry,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // ---- private helpers ----

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Reply, CensusError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        let body = serde_json::from_str(&text).ok();
        if body.is_none() && !text.trim().is_empty() {
            debug!(%status, "Response body is not JSON");
        }
        Ok(Reply { status, body })
    }

    /// GET with the given query, retrying transport failures with backoff
    async fn get_with_retry(&self, query: &[(&str, &str)]) -> Result<Reply, CensusError> {
        let mut delay = self.retry.initial_delay();
        let mut attempt = 1u32;

        loop {
            let request = self.client.get(&self.endpoint).query(query);
            match self.send(request).await.and_then(reject_unreadable) {
                Ok(reply) => return Ok(reply),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Census request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.retry.next_delay(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// POST a command once and return the success envelope
    async fn post_command(&self, command: &CommandRequest) -> Result<ApiEnvelope, CensusError> {
        info!(
            command = %command.command,
            household_id = ?command.household_id,
            "Sending census command"
        );
        let request = self.client.post(&self.endpoint).json(command);
        let reply = self.send(request).await?;
        expect_success(reply)
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, CensusError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CensusError::Transport(format!("failed to build HTTP client: {}", e)))
}

fn transport_error(err: reqwest::Error) -> CensusError {
    if err.is_timeout() {
        CensusError::Transport("request timed out".to_string())
    } else {
        CensusError::Transport(err.to_string())
    }
}

/// Treat a reply without a JSON body as a transport failure, except a bare 404
fn reject_unreadable(reply: Reply) -> Result<Reply, CensusError> {
    if reply.body.is_none() && reply.status != StatusCode::NOT_FOUND {
        return Err(CensusError::Transport(format!(
            "unreadable response (HTTP {})",
            reply.status
        )));
    }
    Ok(reply)
}

fn parse_envelope(body: Value) -> Result<ApiEnvelope, CensusError> {
    serde_json::from_value(body)
        .map_err(|e| CensusError::Transport(format!("unexpected response shape: {}", e)))
}

/// Envelope of a successful reply, or the failure the service reported
fn expect_success(reply: Reply) -> Result<ApiEnvelope, CensusError> {
    let Some(body) = reply.body else {
        return Err(CensusError::Transport(format!(
            "unreadable response (HTTP {})",
            reply.status
        )));
    };
    let envelope = parse_envelope(body)?;
    if !reply.status.is_success() || !envelope.is_success() {
        return Err(CensusError::application(envelope.failure_message()));
    }
    Ok(envelope)
}

/// Whether an application error means the record does not exist
fn is_not_found(err: &CensusError) -> bool {
    match err {
        CensusError::Application { message } => message.to_lowercase().contains("not found"),
        _ => false,
    }
}

/// Keep every JSON object as a record, dropping anything else
fn records_from_values(entries: Vec<Value>) -> Vec<Record> {
    let total = entries.len();
    let records: Vec<Record> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let record = Record::from_value(entry);
            if record.is_none() {
                warn!(position, "Dropping list entry that is not a JSON object");
            }
            record
        })
        .collect();

    let malformed = records.iter().filter(|r| !r.is_well_formed()).count();
    if malformed > 0 {
        warn!(malformed, "Some records are missing their household, members or children");
    }
    debug!(total, kept = records.len(), "Parsed record list");
    records
}

#[async_trait]
impl CensusBackend for ApiClient {
    async fn list_records(&self) -> Result<Vec<Record>, CensusError> {
        info!("Fetching census records");
        let reply = self.get_with_retry(&[("action", "fetchRecords")]).await?;

        let entries = match reply {
            Reply {
                status,
                body: Some(Value::Array(entries)),
            } if status.is_success() => entries,
            other => expect_success(other)?.records.unwrap_or_default(),
        };

        let records = records_from_values(entries);
        info!("Fetched {} census records", records.len());
        Ok(records)
    }

    async fn fetch_record(&self, household_id: &str) -> Result<Option<Record>, CensusError> {
        info!("Fetching census record {}", household_id);
        let reply = self
            .get_with_retry(&[("action", "getRecordById"), ("id", household_id)])
            .await?;

        if reply.status == StatusCode::NOT_FOUND {
            warn!("Census record not found: {}", household_id);
            return Ok(None);
        }

        let envelope = match expect_success(reply) {
            Ok(envelope) => envelope,
            Err(err) if is_not_found(&err) => {
                warn!("Census record not found: {}", household_id);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match envelope.record {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Record::from_value(value).map(Some).ok_or_else(|| {
                CensusError::Transport("record in response is not a JSON object".to_string())
            }),
        }
    }

    async fn fetch_summary(&self) -> Result<CensusSummary, CensusError> {
        let reply = self.get_with_retry(&[("action", "summary")]).await?;
        let has_envelope = reply
            .body
            .as_ref()
            .is_some_and(|body| body.get("status").is_some() || body.get("error").is_some());

        let body = reply.body.clone().unwrap_or(Value::Null);
        if !reply.status.is_success() || has_envelope {
            expect_success(reply)?;
        }

        let summary: CensusSummary = serde_json::from_value(body)
            .map_err(|e| CensusError::Transport(format!("unexpected summary shape: {}", e)))?;
        debug!(?summary, "Fetched census summary");
        Ok(summary)
    }

    async fn create_record(&self, submission: CensusSubmission) -> Result<String, CensusError> {
        let envelope = self
            .post_command(&CommandRequest::submit_new(submission))
            .await?;
        let household_id = envelope.household_id_text().ok_or_else(|| {
            CensusError::application("Census service did not return a household id")
        })?;
        info!("Created household {}", household_id);
        Ok(household_id)
    }

    async fn update_record(
        &self,
        household_id: &str,
        submission: CensusSubmission,
    ) -> Result<(), CensusError> {
        self.post_command(&CommandRequest::update(household_id, submission)).await?;
        info!("Updated household {}", household_id);
        Ok(())
    }

    async fn delete_record(&self, household_id: &str) -> Result<(), CensusError> {
        self.post_command(&CommandRequest::delete(household_id)).await?;
        info!("Deleted household {}", household_id);
        Ok(())
    }
}
