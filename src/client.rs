//! HTTP collector sink
//!
//! POSTs each record as JSON to a remote collector with bearer
//! authentication and a request timeout. Network errors are returned to the
//! dispatcher, which reports them without touching the request path.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::CollectorConfig;
use crate::error::LogError;
use crate::logger::LogSink;
use crate::record::LogRecord;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink that forwards records to an HTTP collector
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    config: CollectorConfig,
}

impl HttpSink {
    /// Build a sink with a shared client. Configuration is validated per
    /// send, so an inactive config yields `MissingConfig` on delivery.
    pub fn new(config: CollectorConfig) -> Result<Self, LogError> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, LogError> {
        Self::new(CollectorConfig::from_env())
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn handle(&self, record: LogRecord) -> Result<(), LogError> {
        send(&self.client, &record, &self.config).await
    }
}

/// Send one record to the collector via HTTP POST
///
/// # Returns
/// * `Ok(())` - collector accepted the record
/// * `Err(LogError)` - missing config, network error, timeout, or non-2xx
pub async fn send(client: &Client, record: &LogRecord, config: &CollectorConfig) -> Result<(), LogError> {
    let url = config.get_url()?;
    let api_key = config.get_api_key()?;

    let endpoint = url.trim_end_matches('/');
    let payload = serde_json::to_string(record)?;

    if config.debug {
        tracing::debug!(%endpoint, %payload, "sending operation log to collector");
    }

    let response = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(LogError::SendFailed(response.status()));
    }

    Ok(())
}
