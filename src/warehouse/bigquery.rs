//! BigQuery warehouse client.
//!
//! Implements the `Warehouse` trait over the BigQuery REST API: statements go
//! through `jobs.query` and unfinished jobs are polled with
//! `jobs.getQueryResults` until they complete.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ColumnInfo, DmlOutcome, QueryResult, Row, Value, Warehouse};
use crate::config::WarehouseConfig;
use crate::error::{InsightsError, Result};

/// How long each request asks BigQuery to wait for the job server-side.
const SERVER_WAIT_MS: u32 = 10_000;

/// Delay between polls for an unfinished job.
const POLL_DELAY_MS: u64 = 500;

/// BigQuery REST client.
#[derive(Clone)]
pub struct BigQueryClient {
    http: Client,
    base_url: Url,
    project_id: String,
    location: Option<String>,
    access_token: String,
    max_results: u32,
    max_poll_attempts: u32,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("base_url", &self.base_url.as_str())
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl BigQueryClient {
    /// Creates a client from the warehouse configuration.
    ///
    /// Requires a project id and an OAuth2 access token.
    pub fn new(config: &WarehouseConfig) -> Result<Self> {
        let project_id = config.require_project()?.to_string();
        let access_token = config.access_token.clone().ok_or_else(|| {
            InsightsError::config(
                "No access token configured. Set GOOGLE_OAUTH_ACCESS_TOKEN \
                 (e.g. from `gcloud auth print-access-token`) or [warehouse] access_token.",
            )
        })?;
        let base_url = config.endpoint_url()?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        // Local emulators are never reached through a proxy.
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| InsightsError::connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            project_id,
            location: config.location.clone(),
            access_token,
            max_results: config.max_results,
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    fn queries_url(&self) -> Result<Url> {
        self.base_url
            .join(&format!("projects/{}/queries", self.project_id))
            .map_err(|e| InsightsError::config(format!("Invalid project id '{}': {e}", self.project_id)))
    }

    fn results_url(&self, job: &JobReference) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("projects/{}/queries/{}", job.project_id, job.job_id))
            .map_err(|e| InsightsError::internal(format!("Invalid job reference: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("timeoutMs", &SERVER_WAIT_MS.to_string());
            pairs.append_pair("maxResults", &self.max_results.to_string());
            if let Some(location) = job.location.as_deref().or(self.location.as_deref()) {
                pairs.append_pair("location", location);
            }
        }
        Ok(url)
    }

    /// Submits one statement and waits until its job is complete.
    async fn run(&self, sql: &str) -> Result<QueryResponse> {
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            location: self.location.as_deref(),
            timeout_ms: SERVER_WAIT_MS,
            max_results: self.max_results,
        };

        debug!(sql_len = sql.len(), project = %self.project_id, "Submitting BigQuery job");
        let response = self
            .http
            .post(self.queries_url()?)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let mut body: QueryResponse = read_response(response).await?;

        let mut attempt = 0;
        while !body.is_complete() {
            let Some(job) = body.job_reference.clone() else {
                return Err(InsightsError::internal(
                    "BigQuery reported an incomplete job without a job reference",
                ));
            };
            attempt += 1;
            if attempt > self.max_poll_attempts {
                return Err(InsightsError::connection(format!(
                    "Job {id} did not complete after {} polls; it may still commit in \
                     BigQuery. Check job {id} before retrying.",
                    self.max_poll_attempts,
                    id = job.job_id,
                )));
            }

            debug!(job_id = %job.job_id, attempt, "Job not complete, polling");
            tokio::time::sleep(Duration::from_millis(POLL_DELAY_MS)).await;

            let response = self
                .http
                .get(self.results_url(&job)?)
                .bearer_auth(&self.access_token)
                .send()
                .await
                .map_err(transport_error)?;
            body = read_response(response).await?;
            if body.job_reference.is_none() {
                body.job_reference = Some(job);
            }
        }

        Ok(body)
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn run_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let body = self.run(sql).await?;
        let result = body.into_query_result(start.elapsed());

        if result.was_truncated {
            warn!(
                "Query produced {} rows, only {} were fetched",
                result.total_rows.unwrap_or_default(),
                result.row_count
            );
        }
        Ok(result)
    }

    async fn execute_dml(&self, sql: &str) -> Result<DmlOutcome> {
        let body = self.run(sql).await?;
        let rows_affected = body.rows_affected();
        if rows_affected.is_none() {
            debug!("BigQuery did not report an affected-row count");
        }
        Ok(DmlOutcome {
            rows_affected,
            job_id: body.job_reference.map(|job| job.job_id),
        })
    }
}

/// Body of a `jobs.query` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    timeout_ms: u32,
    max_results: u32,
}

/// Shared shape of `jobs.query` and `jobs.getQueryResults` responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    job_complete: Option<bool>,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    total_rows: Option<String>,
    page_token: Option<String>,
    num_dml_affected_rows: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl QueryResponse {
    /// A missing `jobComplete` field means the response carries final results.
    fn is_complete(&self) -> bool {
        self.job_complete.unwrap_or(true)
    }

    fn rows_affected(&self) -> Option<u64> {
        let raw = self.num_dml_affected_rows.as_deref()?;
        match raw.parse() {
            Ok(count) => Some(count),
            Err(_) => {
                warn!(raw, "Unparseable numDmlAffectedRows");
                None
            }
        }
    }

    fn into_query_result(self, execution_time: Duration) -> QueryResult {
        let fields = self.schema.map(|s| s.fields).unwrap_or_default();
        let columns = fields
            .iter()
            .map(|f| ColumnInfo::new(f.name.clone(), f.field_type.clone()))
            .collect();

        let rows: Vec<Row> = self
            .rows
            .into_iter()
            .map(|row| convert_row(&fields, row))
            .collect();
        let row_count = rows.len();
        let total_rows = self.total_rows.and_then(|t| t.parse::<u64>().ok());
        let was_truncated =
            self.page_token.is_some() || total_rows.is_some_and(|t| t > row_count as u64);

        QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows,
            was_truncated,
        }
    }
}

fn convert_row(fields: &[FieldSchema], row: TableRow) -> Row {
    row.f
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let field_type = fields
                .get(i)
                .map(|f| f.field_type.to_uppercase())
                .unwrap_or_default();
            convert_cell(&field_type, cell.v)
        })
        .collect()
}

/// Converts a cell using its schema type.
///
/// BigQuery encodes scalars as strings; nested records and repeated fields
/// are kept as their JSON text.
fn convert_cell(field_type: &str, v: serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match v {
        Json::Null => Value::Null,
        Json::String(s) => match field_type {
            "INTEGER" | "INT64" => match s.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::String(s),
            },
            "FLOAT" | "FLOAT64" => match s.parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::String(s),
            },
            "BOOLEAN" | "BOOL" => {
                let parsed = match s.as_str() {
                    "true" => Some(true),
                    "false" => Some(false),
                    _ => None,
                };
                parsed.map(Value::Bool).unwrap_or(Value::String(s))
            }
            _ => Value::String(s),
        },
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or_else(|| Value::String(n.to_string())),
        other => Value::String(other.to_string()),
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(InsightsError::api(api_error_message(status.as_u16(), &body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| InsightsError::internal(format!("Failed to decode BigQuery response: {e}")))
}

/// Extracts the diagnostic from a Google API error body, keeping its message verbatim.
fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{status} {code}: {}", envelope.error.message),
            None => format!("{status}: {}", envelope.error.message),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn transport_error(e: reqwest::Error) -> InsightsError {
    if e.is_timeout() {
        InsightsError::connection(format!("Request to BigQuery timed out: {e}"))
    } else {
        InsightsError::connection(format!("Request to BigQuery failed: {e}"))
    }
}
