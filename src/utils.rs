//! Utility functions for the interceptor
//!
//! Request ids for diagnostics and the request start timestamp.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a unique id used to correlate diagnostics of one request
///
/// Uses UUID v4; it never appears in the log record itself.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time, used as the record's `createdAt`
pub fn current_time() -> DateTime<Utc> {
    Utc::now()
}
