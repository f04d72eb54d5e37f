//! Record assembly
//!
//! Turns one captured request/response pair into a [`LogRecord`], or decides
//! that the request is not logged. Override values always win over automatic
//! derivation; malformed bodies degrade to empty content instead of failing.

use actix_web::http::StatusCode;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::OpLogConfig;
use crate::fields::OverrideSet;
use crate::record::{LogRecord, Outcome};
use crate::redact::redact;

/// Request data the assembler needs, captured by the middleware
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: String,

    /// Request path without the query string
    pub path: String,

    /// Full request body as received, before the handler read it
    pub body: actix_web::web::Bytes,

    /// Value of the configured source-address header, if present
    pub source_address: Option<String>,

    /// Authenticated caller, if an upstream layer attached one
    pub actor: Option<String>,

    pub started_at: DateTime<Utc>,
}

impl RequestSnapshot {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: actix_web::web::Bytes::new(),
            source_address: None,
            actor: None,
            started_at: Utc::now(),
        }
    }
}

/// Build the record for one request. Returns `None` when no event type can be
/// determined; nothing else is evaluated in that case.
pub fn assemble(
    request: &RequestSnapshot,
    status: StatusCode,
    response_body: &[u8],
    overrides: Option<&OverrideSet>,
    config: &OpLogConfig,
) -> Option<LogRecord> {
    let event_type = overrides
        .and_then(OverrideSet::event_type)
        .or_else(|| config.event_type_for(&request.method, &request.path))?
        .to_string();

    let response = if response_body.is_empty() {
        None
    } else {
        parse_object(response_body, "response")
    };

    let username = overrides
        .and_then(OverrideSet::username)
        .map(str::to_string)
        .or_else(|| request.actor.clone())
        .unwrap_or_default();

    let ip = overrides
        .and_then(OverrideSet::ip)
        .map(str::to_string)
        .or_else(|| request.source_address.clone())
        .unwrap_or_default();

    let result = resolve_outcome(status, response.as_ref(), overrides, config);
    let content = build_content(&request.body, response, overrides, config);

    Some(LogRecord {
        event_type,
        username,
        ip,
        content,
        result,
        created_at: request.started_at,
    })
}

/// Override, then status class, then the configured assertion
pub fn resolve_outcome(
    status: StatusCode,
    response: Option<&Map<String, Value>>,
    overrides: Option<&OverrideSet>,
    config: &OpLogConfig,
) -> Outcome {
    if let Some(result) = overrides.and_then(OverrideSet::result) {
        return result;
    }
    if status.as_u16() >= 400 {
        return Outcome::Failure;
    }
    match response {
        Some(body) => Outcome::from((config.outcome_assert)(body)),
        None => Outcome::Failure,
    }
}

fn build_content(
    request_body: &[u8],
    response: Option<Map<String, Value>>,
    overrides: Option<&OverrideSet>,
    config: &OpLogConfig,
) -> String {
    let request = if request_body.is_empty() {
        String::new()
    } else {
        parse_object(request_body, "request")
            .map(|body| redacted_text(body, config))
            .unwrap_or_default()
    };

    let response = match overrides.and_then(OverrideSet::content) {
        Some(content) => content.to_string(),
        None => response
            .map(|body| redacted_text(body, config))
            .unwrap_or_default(),
    };

    format!("request: {}\nresponse: {}", request, response)
}

fn redacted_text(mut body: Map<String, Value>, config: &OpLogConfig) -> String {
    redact(&mut body, &config.redaction);
    serde_json::to_string(&body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize redacted body");
        String::new()
    })
}

fn parse_object(bytes: &[u8], side: &'static str) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Map<String, Value>>(bytes) {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::warn!(side, error = %e, "body is not a JSON object, omitting it from the log");
            None
        }
    }
}
