//! # Graphload Config
//!
//! Configuration for the graphload bulk ingestion tool.
//!
//! Provides TOML-based configuration parsing and validation for the store
//! connection, record-source paths, load tuning, and logging.
//!
//! # Configuration Schema
//!
//! The configuration file (`graphload.toml`) supports the following sections:
//! - `[store]` — OrientDB connection (base_url, database, credentials, classes)
//! - `[sources]` — Record-source file paths (nodes, edges)
//! - `[load]` — Batch size, worker pool size, channel capacity, schema setup
//! - `[log]` — Log level and format
//!
//! # Environment Variable Overrides
//!
//! Config fields can be overridden via environment variables using the
//! `GRAPHLOAD_` prefix and `_` as section separator:
//! - `GRAPHLOAD_STORE_BASE_URL` → `store.base_url`
//! - `GRAPHLOAD_STORE_DATABASE` → `store.database`
//! - `GRAPHLOAD_STORE_USERNAME` → `store.username`
//! - `GRAPHLOAD_STORE_PASSWORD` → `store.password`
//! - `GRAPHLOAD_SOURCES_NODES` → `sources.nodes`
//! - `GRAPHLOAD_SOURCES_EDGES` → `sources.edges`
//! - `GRAPHLOAD_LOAD_BATCH_SIZE` → `load.batch_size`
//! - `GRAPHLOAD_LOAD_WORKERS` → `load.workers`
//! - `GRAPHLOAD_LOG_LEVEL` → `log.level`
//! - etc.

use serde::{Deserialize, Serialize};

/// Top-level graphload configuration.
///
/// Parsed from `graphload.toml` or constructed programmatically.
/// Environment variables with the `GRAPHLOAD_` prefix override TOML values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Store connection settings.
    #[serde(default)]
    pub store: StoreSection,
    /// Record-source file paths.
    #[serde(default)]
    pub sources: SourcesSection,
    /// Load tuning settings.
    #[serde(default)]
    pub load: LoadSection,
    /// Logging settings.
    #[serde(default)]
    pub log: LogSection,
}

/// Store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Base URL of the OrientDB REST API (default: "http://localhost:2480").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Database name (default: "graph").
    #[serde(default = "default_database")]
    pub database: String,
    /// Basic-auth username (default: "root").
    #[serde(default = "default_username")]
    pub username: String,
    /// Basic-auth password. No default — set here or via
    /// `GRAPHLOAD_STORE_PASSWORD`.
    #[serde(default)]
    pub password: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Vertex class name (default: "V").
    #[serde(default = "default_node_class")]
    pub node_class: String,
    /// Edge class name (default: "E").
    #[serde(default = "default_edge_class")]
    pub edge_class: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            database: default_database(),
            username: default_username(),
            password: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            node_class: default_node_class(),
            edge_class: default_edge_class(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:2480".to_string()
}
fn default_database() -> String {
    "graph".to_string()
}
fn default_username() -> String {
    "root".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_node_class() -> String {
    "V".to_string()
}
fn default_edge_class() -> String {
    "E".to_string()
}

/// Record-source file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesSection {
    /// Node-attribute source: one `name, popularity` record per line
    /// (default: "nodes.csv").
    #[serde(default = "default_nodes_file")]
    pub nodes: String,
    /// Edge-list source: one `from, to` record per line
    /// (default: "edges.csv").
    #[serde(default = "default_edges_file")]
    pub edges: String,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            nodes: default_nodes_file(),
            edges: default_edges_file(),
        }
    }
}

fn default_nodes_file() -> String {
    "nodes.csv".to_string()
}
fn default_edges_file() -> String {
    "edges.csv".to_string()
}

/// Load tuning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSection {
    /// Maximum operations per batch (default: 5000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Worker pool size per phase (default: 4).
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bounded work-channel capacity, in batches (default: 8).
    /// Peak buffered operations ≈ (channel_capacity + workers) × batch_size.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Whether the store applies each batch as one all-or-nothing unit
    /// (default: false).
    #[serde(default)]
    pub transactional: bool,
    /// Ensure the database exists and the name property + unique index are
    /// in place before loading (default: true).
    #[serde(default = "default_ensure_schema")]
    pub ensure_schema: bool,
}

impl Default for LoadSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
            channel_capacity: default_channel_capacity(),
            transactional: false,
            ensure_schema: default_ensure_schema(),
        }
    }
}

fn default_batch_size() -> usize {
    5000
}
fn default_workers() -> usize {
    4
}
fn default_channel_capacity() -> usize {
    8
}
fn default_ensure_schema() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    /// Log level (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format: "text" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl LoaderConfig {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides and validate.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse_toml(&contents)
    }

    /// Parse configuration from a TOML string, apply env overrides, then
    /// validate.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let mut config: LoaderConfig = toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Variables use the `GRAPHLOAD_` prefix with `_` as section separator:
    /// - `GRAPHLOAD_STORE_BASE_URL` → `store.base_url`
    /// - `GRAPHLOAD_STORE_DATABASE` → `store.database`
    /// - `GRAPHLOAD_STORE_USERNAME` → `store.username`
    /// - `GRAPHLOAD_STORE_PASSWORD` → `store.password`
    /// - `GRAPHLOAD_STORE_REQUEST_TIMEOUT_SECS` → `store.request_timeout_secs`
    /// - `GRAPHLOAD_STORE_NODE_CLASS` → `store.node_class`
    /// - `GRAPHLOAD_STORE_EDGE_CLASS` → `store.edge_class`
    /// - `GRAPHLOAD_SOURCES_NODES` → `sources.nodes`
    /// - `GRAPHLOAD_SOURCES_EDGES` → `sources.edges`
    /// - `GRAPHLOAD_LOAD_BATCH_SIZE` → `load.batch_size`
    /// - `GRAPHLOAD_LOAD_WORKERS` → `load.workers`
    /// - `GRAPHLOAD_LOAD_CHANNEL_CAPACITY` → `load.channel_capacity`
    /// - `GRAPHLOAD_LOAD_TRANSACTIONAL` → `load.transactional`
    /// - `GRAPHLOAD_LOAD_ENSURE_SCHEMA` → `load.ensure_schema`
    /// - `GRAPHLOAD_LOG_LEVEL` → `log.level`
    /// - `GRAPHLOAD_LOG_FORMAT` → `log.format`
    pub fn apply_env_overrides(&mut self) {
        // Store overrides
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_BASE_URL") {
            self.store.base_url = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_DATABASE") {
            self.store.database = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_USERNAME") {
            self.store.username = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_PASSWORD") {
            self.store.password = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.store.request_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_NODE_CLASS") {
            self.store.node_class = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_STORE_EDGE_CLASS") {
            self.store.edge_class = v;
        }

        // Sources overrides
        if let Ok(v) = std::env::var("GRAPHLOAD_SOURCES_NODES") {
            self.sources.nodes = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_SOURCES_EDGES") {
            self.sources.edges = v;
        }

        // Load overrides
        if let Ok(v) = std::env::var("GRAPHLOAD_LOAD_BATCH_SIZE") {
            if let Ok(bs) = v.parse::<usize>() {
                self.load.batch_size = bs;
            }
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_LOAD_WORKERS") {
            if let Ok(w) = v.parse::<usize>() {
                self.load.workers = w;
            }
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_LOAD_CHANNEL_CAPACITY") {
            if let Ok(c) = v.parse::<usize>() {
                self.load.channel_capacity = c;
            }
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_LOAD_TRANSACTIONAL") {
            if let Ok(b) = v.parse::<bool>() {
                self.load.transactional = b;
            }
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_LOAD_ENSURE_SCHEMA") {
            if let Ok(b) = v.parse::<bool>() {
                self.load.ensure_schema = b;
            }
        }

        // Log overrides
        if let Ok(v) = std::env::var("GRAPHLOAD_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("GRAPHLOAD_LOG_FORMAT") {
            self.log.format = v;
        }
    }

    /// Validate configuration values with detailed error messages.
    pub fn validate(&self) -> anyhow::Result<()> {
        // --- Store validation ---
        if !self.store.base_url.starts_with("http://") && !self.store.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "store.base_url must start with http:// or https:// (got '{}').",
                self.store.base_url
            );
        }
        if self.store.database.is_empty() {
            anyhow::bail!(
                "store.database must not be empty. Set it in graphload.toml or via GRAPHLOAD_STORE_DATABASE env var."
            );
        }
        if self.store.username.is_empty() {
            anyhow::bail!("store.username must not be empty.");
        }
        if self.store.password.is_empty() {
            anyhow::bail!(
                "store.password must not be empty. Set it in graphload.toml or via GRAPHLOAD_STORE_PASSWORD env var."
            );
        }
        if self.store.request_timeout_secs == 0 {
            anyhow::bail!("store.request_timeout_secs must be > 0 (got 0).");
        }
        if self.store.node_class.is_empty() {
            anyhow::bail!("store.node_class must not be empty.");
        }
        if self.store.edge_class.is_empty() {
            anyhow::bail!("store.edge_class must not be empty.");
        }

        // --- Sources validation ---
        if self.sources.nodes.is_empty() {
            anyhow::bail!("sources.nodes must not be empty.");
        }
        if self.sources.edges.is_empty() {
            anyhow::bail!("sources.edges must not be empty.");
        }

        // --- Load validation ---
        if self.load.batch_size == 0 {
            anyhow::bail!(
                "load.batch_size must be > 0 (got 0). Set it in graphload.toml or via GRAPHLOAD_LOAD_BATCH_SIZE env var."
            );
        }
        if self.load.workers == 0 {
            anyhow::bail!(
                "load.workers must be > 0 (got 0). Set it in graphload.toml or via GRAPHLOAD_LOAD_WORKERS env var."
            );
        }
        if self.load.channel_capacity == 0 {
            anyhow::bail!("load.channel_capacity must be > 0 (got 0).");
        }

        // --- Log validation ---
        let valid_log_formats = ["text", "json"];
        if !valid_log_formats.contains(&self.log.format.as_str()) {
            anyhow::bail!(
                "log.format must be one of: {} (got '{}').",
                valid_log_formats.join(", "),
                self.log.format
            );
        }

        Ok(())
    }

    /// Generate a fully commented example configuration file.
    pub fn example_toml_commented() -> String {
        r#"# =============================================================================
# Graphload Configuration File
# =============================================================================
# This file configures the graphload bulk graph ingestion tool.
# All values shown below are defaults unless noted otherwise.
#
# Environment variables override TOML values. Use the GRAPHLOAD_ prefix:
#   GRAPHLOAD_LOAD_BATCH_SIZE=10000 graphload load

# -----------------------------------------------------------------------------
# [store] — OrientDB connection
# -----------------------------------------------------------------------------
[store]
# Base URL of the OrientDB REST API.
base_url = "http://localhost:2480"
# Target database. Created on first load when load.ensure_schema is true.
database = "graph"
# Basic-auth credentials presented on every request.
username = "root"
# No default — must be set here or via GRAPHLOAD_STORE_PASSWORD.
password = ""
# Per-request timeout in seconds.
request_timeout_secs = 30
# Vertex and edge class names.
node_class = "V"
edge_class = "E"

# -----------------------------------------------------------------------------
# [sources] — record-source files
# -----------------------------------------------------------------------------
[sources]
# Node-attribute source: one `name, popularity` record per line.
# The name may be double-quoted; popularity is a base-10 integer.
nodes = "nodes.csv"
# Edge-list source: one `from, to` record per line (names, not identifiers).
edges = "edges.csv"

# -----------------------------------------------------------------------------
# [load] — load tuning
# -----------------------------------------------------------------------------
[load]
# Maximum operations per batch request.
batch_size = 5000
# Worker pool size for the node and edge phases.
workers = 4
# Bounded work-channel capacity, in batches. Peak buffered operations is
# roughly (channel_capacity + workers) * batch_size.
channel_capacity = 8
# Ask the store to apply each batch as one all-or-nothing unit.
transactional = false
# Create the database, name property, and unique name index before loading.
ensure_schema = true

# -----------------------------------------------------------------------------
# [log] — logging
# -----------------------------------------------------------------------------
[log]
# Log level: trace, debug, info, warn, error
level = "info"
# Log format: "text" (human-readable) or "json" (structured)
format = "text"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Tests that read or write process environment variables must not
    /// interleave (parse_toml applies env overrides).
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn valid_config() -> LoaderConfig {
        let mut config = LoaderConfig::default();
        config.store.password = "secret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.store.base_url, "http://localhost:2480");
        assert_eq!(config.store.database, "graph");
        assert_eq!(config.store.username, "root");
        assert_eq!(config.store.password, "");
        assert_eq!(config.store.request_timeout_secs, 30);
        assert_eq!(config.store.node_class, "V");
        assert_eq!(config.store.edge_class, "E");
        assert_eq!(config.sources.nodes, "nodes.csv");
        assert_eq!(config.sources.edges, "edges.csv");
        assert_eq!(config.load.batch_size, 5000);
        assert_eq!(config.load.workers, 4);
        assert_eq!(config.load.channel_capacity, 8);
        assert!(!config.load.transactional);
        assert!(config.load.ensure_schema);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let _guard = env_guard();
        let toml_str = r#"
            [store]
            password = "secret"
        "#;
        let config = LoaderConfig::parse_toml(toml_str).expect("should parse");
        assert_eq!(config.store.password, "secret");
        // Unspecified sections fall back to defaults.
        assert_eq!(config.load.batch_size, 5000);
        assert_eq!(config.sources.nodes, "nodes.csv");
    }

    #[test]
    fn test_parse_full_toml() {
        let _guard = env_guard();
        let toml_str = r#"
            [store]
            base_url = "http://db.internal:2480"
            database = "taxonomy"
            username = "loader"
            password = "hunter2"
            request_timeout_secs = 60
            node_class = "Category"
            edge_class = "Subsumes"

            [sources]
            nodes = "data/popularity.csv"
            edges = "data/taxonomy.csv"

            [load]
            batch_size = 20000
            workers = 8
            channel_capacity = 4
            transactional = true
            ensure_schema = false

            [log]
            level = "debug"
            format = "json"
        "#;
        let config = LoaderConfig::parse_toml(toml_str).expect("should parse");
        assert_eq!(config.store.base_url, "http://db.internal:2480");
        assert_eq!(config.store.database, "taxonomy");
        assert_eq!(config.store.node_class, "Category");
        assert_eq!(config.sources.edges, "data/taxonomy.csv");
        assert_eq!(config.load.batch_size, 20000);
        assert_eq!(config.load.workers, 8);
        assert!(config.load.transactional);
        assert!(!config.load.ensure_schema);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = LoaderConfig::parse_toml("this is not toml [[[");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_validate_rejects_empty_password() {
        let config = LoaderConfig::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("store.password"));
        assert!(err.contains("GRAPHLOAD_STORE_PASSWORD"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = valid_config();
        config.store.base_url = "localhost:2480".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("store.base_url"));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = valid_config();
        config.load.batch_size = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("load.batch_size"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = valid_config();
        config.load.workers = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("load.workers"));
    }

    #[test]
    fn test_validate_rejects_zero_channel_capacity() {
        let mut config = valid_config();
        config.load.channel_capacity = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("load.channel_capacity"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = valid_config();
        config.log.format = "yaml".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("log.format"));
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = env_guard();
        std::env::set_var("GRAPHLOAD_STORE_DATABASE", "override_db");
        std::env::set_var("GRAPHLOAD_LOAD_BATCH_SIZE", "123");
        std::env::set_var("GRAPHLOAD_LOAD_TRANSACTIONAL", "true");

        let mut config = valid_config();
        config.apply_env_overrides();
        assert_eq!(config.store.database, "override_db");
        assert_eq!(config.load.batch_size, 123);
        assert!(config.load.transactional);

        std::env::remove_var("GRAPHLOAD_STORE_DATABASE");
        std::env::remove_var("GRAPHLOAD_LOAD_BATCH_SIZE");
        std::env::remove_var("GRAPHLOAD_LOAD_TRANSACTIONAL");
    }

    #[test]
    fn test_env_override_ignores_unparsable_numeric() {
        let _guard = env_guard();
        std::env::set_var("GRAPHLOAD_LOAD_WORKERS", "not-a-number");

        let mut config = valid_config();
        config.apply_env_overrides();
        assert_eq!(config.load.workers, 4);

        std::env::remove_var("GRAPHLOAD_LOAD_WORKERS");
    }

    #[test]
    fn test_example_toml_commented() {
        let commented = LoaderConfig::example_toml_commented();
        assert!(commented.contains("[store]"));
        assert!(commented.contains("[sources]"));
        assert!(commented.contains("[load]"));
        assert!(commented.contains("[log]"));
        assert!(commented.contains("GRAPHLOAD_"));
        assert!(commented.contains("batch_size"));
    }

    #[test]
    fn test_example_toml_parses() {
        // The example must stay in sync with the schema. It fails validation
        // (empty password) but must parse cleanly.
        let commented = LoaderConfig::example_toml_commented();
        let parsed: Result<LoaderConfig, _> = toml::from_str(&commented);
        assert!(parsed.is_ok(), "example config must parse: {:?}", parsed.err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = valid_config();
        let serialized = toml::to_string(&config).expect("should serialize");
        let deserialized: LoaderConfig = toml::from_str(&serialized).expect("should deserialize");
        assert_eq!(deserialized.store.database, config.store.database);
        assert_eq!(deserialized.load.batch_size, config.load.batch_size);
    }
}
