//! Configuration for the operation-log interceptor
//!
//! [`OpLogConfig`] is the composition surface: event classification table,
//! redaction table, sink, source-address header and outcome assertion. It is
//! built once, wrapped in an `Arc` and shared read-only by every request.
//!
//! [`CollectorConfig`] holds the environment-loaded settings of the HTTP
//! collector sink, with fail-soft behavior when they are missing.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::logger::{LogSink, TracingSink};
use crate::redact::RedactionTable;

/// Header consulted for the caller address unless configured otherwise
pub const DEFAULT_IP_HEADER: &str = "X-Real-Ip";

/// Decides success from a parsed response body when the status is < 400
pub type OutcomeAssert = Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;

/// Default assertion: a numeric `code` field equal to `0` means success
pub fn default_outcome_assert(body: &Map<String, Value>) -> bool {
    match body.get("code") {
        Some(Value::Number(code)) => code
            .as_i64()
            .or_else(|| code.as_f64().map(|c| c as i64))
            .is_some_and(|c| c == 0),
        _ => false,
    }
}

/// Classification key for a request: `METHOD_path`
pub fn event_key(method: &str, path: &str) -> String {
    format!("{}_{}", method, path)
}

/// Interceptor configuration, fixed for the lifetime of each request
#[derive(Clone)]
pub struct OpLogConfig {
    /// `METHOD_path` -> event type. Requests without an entry are not logged.
    pub event_types: HashMap<String, String>,

    pub redaction: RedactionTable,

    /// Request header carrying the caller address
    pub ip_header: String,

    pub outcome_assert: OutcomeAssert,

    pub sink: Arc<dyn LogSink>,

    /// Largest request body kept for the record. Bodies above it are
    /// streamed to the handler untouched and logged with an empty request
    /// side. `None` captures every body in full.
    pub max_body_size: Option<usize>,
}

impl Default for OpLogConfig {
    fn default() -> Self {
        Self {
            event_types: HashMap::new(),
            redaction: RedactionTable::new(),
            ip_header: DEFAULT_IP_HEADER.to_string(),
            outcome_assert: Arc::new(default_outcome_assert),
            sink: Arc::new(TracingSink),
            max_body_size: None,
        }
    }
}

impl OpLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the classification table. Keys use the `METHOD_path` form.
    pub fn with_event_types<I, K, V>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.event_types = table
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add a single classification entry
    pub fn with_event_type(
        mut self,
        method: &str,
        path: &str,
        event_type: impl Into<String>,
    ) -> Self {
        self.event_types
            .insert(event_key(method, path), event_type.into());
        self
    }

    pub fn with_redaction(mut self, table: RedactionTable) -> Self {
        self.redaction = table;
        self
    }

    pub fn with_ip_header(mut self, header: impl Into<String>) -> Self {
        self.ip_header = header.into();
        self
    }

    pub fn with_outcome_assert<F>(mut self, assert: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        self.outcome_assert = Arc::new(assert);
        self
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }

    /// Look up the configured event type; empty labels count as missing
    pub fn event_type_for(&self, method: &str, path: &str) -> Option<&str> {
        self.event_types
            .get(&event_key(method, path))
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for OpLogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpLogConfig")
            .field("event_types", &self.event_types)
            .field("redaction", &self.redaction)
            .field("ip_header", &self.ip_header)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

/// Settings for the HTTP collector sink
///
/// Loaded from environment variables:
/// - `OPLOG_COLLECTOR_URL`: endpoint that accepts JSON records via POST
/// - `OPLOG_API_KEY`: bearer token sent with every record
/// - `OPLOG_DEBUG`: optional flag ("true"/"1"/"yes") to trace every payload
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Whether both URL and API key are present
    pub active: bool,

    pub api_key: Option<String>,

    pub url: Option<String>,

    pub debug: bool,
}

impl CollectorConfig {
    /// Load from the environment. Missing values disable the collector
    /// with a warning; they never abort the host application.
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPLOG_API_KEY").ok();
        let url = std::env::var("OPLOG_COLLECTOR_URL").ok();

        let config = Self {
            debug: debug_flag(std::env::var("OPLOG_DEBUG").ok().as_deref()),
            ..Self::new(api_key, url)
        };

        if !config.active {
            tracing::warn!(
                api_key_present = config.api_key.is_some(),
                url_present = config.url.is_some(),
                "oplog collector disabled: set OPLOG_API_KEY and OPLOG_COLLECTOR_URL to enable it"
            );
        } else {
            tracing::debug!(url = ?config.url, debug = config.debug, "oplog collector configured");
        }

        config
    }

    /// Create configuration with explicit values
    pub fn new(api_key: Option<String>, url: Option<String>) -> Self {
        let active = api_key.is_some() && url.is_some();
        Self {
            active,
            api_key,
            url,
            debug: false,
        }
    }

    pub fn get_api_key(&self) -> Result<&str, crate::error::LogError> {
        self.api_key
            .as_deref()
            .ok_or(crate::error::LogError::MissingConfig)
    }

    pub fn get_url(&self) -> Result<&str, crate::error::LogError> {
        self.url
            .as_deref()
            .ok_or(crate::error::LogError::MissingConfig)
    }
}

/// `OPLOG_DEBUG` is on for "true", "1" or "yes" in any case
fn debug_flag(value: Option<&str>) -> bool {
    value.is_some_and(|val| matches!(val.to_lowercase().as_str(), "true" | "1" | "yes"))
}
