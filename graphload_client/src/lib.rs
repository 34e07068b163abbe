//! # Graphload Client
//!
//! HTTP client for the OrientDB REST API, covering the surface the bulk
//! loader needs:
//!
//! - **Batch submit** — `POST /batch/{database}` with a transactional flag
//!   and an ordered operation list (direct record creates and SQL scripts)
//! - **Command** — `POST /command/{database}/sql` running a single SQL
//!   statement and returning result rows
//! - **Database management** — existence probe and `plocal` creation
//! - **Schema setup** — name property + unique name index on the node class
//!
//! Every request carries HTTP basic auth and a client-level timeout. The
//! client performs **no retries**: node creation under a unique-name index is
//! not idempotent, so retry policy belongs to the caller (see
//! [`StoreError`]).
//!
//! # Example
//!
//! ```no_run
//! use graphload_client::{OrientClient, StoreConfig, StoreOperation};
//!
//! # async fn run() -> graphload_client::Result<()> {
//! let client = OrientClient::new(StoreConfig {
//!     database: "graph".into(),
//!     password: "secret".into(),
//!     ..StoreConfig::default()
//! })?;
//! client.ensure_database().await?;
//! client.ensure_schema().await?;
//! let ops = vec![StoreOperation::CreateNode {
//!     name: "Science".into(),
//!     popularity: 42,
//! }];
//! client.submit_batch(&ops, false).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by the store client.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure (connection refused, timeout, DNS, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned status {status}: {message}")]
    Server { status: u16, message: String },

    /// The store answered 2xx but the body could not be decoded.
    #[error("failed to decode store response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for client operations.
pub type Result<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`OrientClient`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub base_url: String,
    /// Database name used in every endpoint path.
    pub database: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Per-request deadline applied by the underlying HTTP client.
    pub request_timeout: Duration,
    /// Vertex class for create-node operations and identity reads.
    pub node_class: String,
    /// Edge class for create-edge statements.
    pub edge_class: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2480".to_string(),
            database: "graph".to_string(),
            username: "root".to_string(),
            password: String::new(),
            request_timeout: Duration::from_secs(30),
            node_class: "V".to_string(),
            edge_class: "E".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Operations & wire types
// ---------------------------------------------------------------------------

/// Store-assigned record identifier, e.g. `#12:0`.
///
/// Opaque to the loader: it is read back from the store after node creation
/// and interpolated into edge statements verbatim.
pub type Rid = String;

/// A single store mutation carried by a batch.
///
/// Operations are independent of each other; nothing in a batch references
/// another operation in the same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    /// Create one vertex with its natural key and popularity score.
    CreateNode { name: String, popularity: i64 },
    /// Create one directed edge between two already-resolved vertices.
    CreateEdge { from: Rid, to: Rid },
}

/// Body of `POST /batch/{database}`.
#[derive(Debug, Serialize)]
struct BatchRequest {
    transaction: bool,
    operations: Vec<BatchEntry>,
}

/// One entry of the batch operation list.
///
/// Create-node operations map to direct record creates (`type: "c"`); all
/// create-edge operations of a batch are folded into one SQL script entry,
/// because edges must go through the SQL layer to keep vertex in/out
/// pointers consistent.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum BatchEntry {
    #[serde(rename = "c")]
    Create { record: serde_json::Value },
    #[serde(rename = "script")]
    Script { language: String, script: Vec<String> },
}

/// Body of `POST /command/{database}/sql`.
#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

/// Identifier info the store reports inline for a created record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecord {
    /// The `name` field of the created record, when echoed back.
    pub name: Option<String>,
    /// The assigned `@rid`, when reported.
    pub rid: Option<Rid>,
}

/// Terminal result of one successful batch submission.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Per-operation created records, in response order. Best effort: the
    /// store does not guarantee an entry per operation, so callers needing a
    /// complete identifier mapping must read it back separately.
    pub created: Vec<CreatedRecord>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for one OrientDB database over the REST API.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference-counted,
/// so worker pools hand out clones freely.
#[derive(Debug, Clone)]
pub struct OrientClient {
    base_url: String,
    database: String,
    username: String,
    password: String,
    node_class: String,
    edge_class: String,
    http: reqwest::Client,
}

impl OrientClient {
    /// Creates a client from connection settings.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            database: config.database,
            username: config.username,
            password: config.password,
            node_class: config.node_class,
            edge_class: config.edge_class,
            http,
        })
    }

    /// The configured database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The configured vertex class.
    pub fn node_class(&self) -> &str {
        &self.node_class
    }

    /// The configured edge class.
    pub fn edge_class(&self) -> &str {
        &self.edge_class
    }

    /// Submits one batch of operations.
    ///
    /// The `transactional` flag asks the store to apply the batch as a
    /// single all-or-nothing unit. On a non-success status the diagnostic
    /// text from the store's error envelope is carried in
    /// [`StoreError::Server`]. Failed batches are **not** retried here.
    pub async fn submit_batch(
        &self,
        operations: &[StoreOperation],
        transactional: bool,
    ) -> Result<BatchOutcome> {
        let body = BatchRequest {
            transaction: transactional,
            operations: self.wire_operations(operations),
        };
        let response: serde_json::Value = self
            .request_json(reqwest::Method::POST, &format!("/batch/{}", self.database), &body)
            .await?;
        Ok(BatchOutcome {
            created: created_records(&response),
        })
    }

    /// Runs a single SQL statement and returns the result rows.
    ///
    /// Appends nothing to the statement; callers wanting an unbounded result
    /// set must include `LIMIT -1` themselves (the store caps results at 20
    /// rows by default).
    pub async fn query(&self, sql: &str) -> Result<Vec<serde_json::Value>> {
        let response: CommandResponse = self
            .request_json(
                reqwest::Method::POST,
                &format!("/command/{}/sql", self.database),
                &CommandRequest { command: sql },
            )
            .await?;
        Ok(response.result)
    }

    /// Probes whether the configured database exists.
    pub async fn database_exists(&self) -> Result<bool> {
        let url = format!("{}/database/{}", self.base_url, self.database);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Creates the configured database with plocal storage.
    pub async fn create_database(&self) -> Result<()> {
        let _: serde_json::Value = self
            .request_json(
                reqwest::Method::POST,
                &format!("/database/{}/plocal", self.database),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    /// Ensures the database exists, creating it when absent.
    ///
    /// Returns `true` when the database was created by this call.
    pub async fn ensure_database(&self) -> Result<bool> {
        if self.database_exists().await? {
            return Ok(false);
        }
        self.create_database().await?;
        Ok(true)
    }

    /// Ensures the node class carries a `name` property and a unique index
    /// on it.
    ///
    /// The unique index is what turns duplicate names into server-side
    /// errors during the node phase. Already-exists responses from the store
    /// are tolerated so the call is safe to repeat across runs.
    pub async fn ensure_schema(&self) -> Result<()> {
        let statements = [
            format!("CREATE PROPERTY {}.name STRING", self.node_class),
            format!("CREATE INDEX {}.name UNIQUE", self.node_class),
        ];
        for statement in &statements {
            match self.query(statement).await {
                Ok(_) => {}
                Err(StoreError::Server { message, .. }) if is_already_exists(&message) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Maps operations onto the wire operation list.
    ///
    /// Creates keep their input order; edge statements are folded into one
    /// trailing script entry.
    fn wire_operations(&self, operations: &[StoreOperation]) -> Vec<BatchEntry> {
        let mut entries = Vec::new();
        let mut edge_statements = Vec::new();
        for op in operations {
            match op {
                StoreOperation::CreateNode { name, popularity } => {
                    entries.push(BatchEntry::Create {
                        record: serde_json::json!({
                            "@class": self.node_class,
                            "name": name,
                            "popularity": popularity,
                        }),
                    });
                }
                StoreOperation::CreateEdge { from, to } => {
                    edge_statements.push(format!(
                        "CREATE EDGE {} FROM {} TO {}",
                        self.edge_class, from, to
                    ));
                }
            }
        }
        if !edge_statements.is_empty() {
            entries.push(BatchEntry::Script {
                language: "sql".to_string(),
                script: edge_statements,
            });
        }
        entries
    }

    /// Core request helper: send JSON, check status, decode JSON.
    async fn request_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status: status.as_u16(),
                message: extract_error_message(&body_text),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Response body of the command endpoint.
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

/// Pulls created-record info out of a batch response.
///
/// The store reports created records under `result`; entries that are not
/// objects (script return values and the like) are ignored.
fn created_records(response: &serde_json::Value) -> Vec<CreatedRecord> {
    let Some(rows) = response.get("result").and_then(|r| r.as_array()) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| row.as_object())
        .map(|row| CreatedRecord {
            name: row.get("name").and_then(|v| v.as_str()).map(str::to_string),
            rid: row.get("@rid").and_then(|v| v.as_str()).map(str::to_string),
        })
        .collect()
}

/// Extracts the diagnostic text from the store's error envelope
/// (`{"errors": [{"content": "..."}]}`), falling back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(content) = value
            .get("errors")
            .and_then(|e| e.as_array())
            .and_then(|a| a.first())
            .and_then(|first| first.get("content"))
            .and_then(|c| c.as_str())
        {
            return content.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty response body)".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether a server diagnostic reports that a property or index is already
/// in place.
fn is_already_exists(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exists") || lower.contains("already defined") || lower.contains("already used")
}

/// Escapes a string value for interpolation into a single-quoted SQL
/// literal: backslashes and single quotes are backslash-escaped.
pub fn escape_sql_str(input: &str) -> String {
    input.replace('\\', "\\\\").replace('\'', "\\'")
}
