//! Operation-log record handed to sinks
//!
//! One record is produced per logged request. The serialized field names are
//! stable: `eventType`, `username`, `ip`, `content`, `result`, `createdAt`.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Outcome of a logged operation, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub const SUCCESS_CODE: i64 = 1;
    pub const FAILURE_CODE: i64 = 2;

    pub fn code(self) -> i64 {
        match self {
            Outcome::Success => Self::SUCCESS_CODE,
            Outcome::Failure => Self::FAILURE_CODE,
        }
    }

    /// Map an integer code back to an outcome. `0` and unknown codes mean "unset".
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::SUCCESS_CODE => Some(Outcome::Success),
            Self::FAILURE_CODE => Some(Outcome::Failure),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        Outcome::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown outcome code {code}")))
    }
}

/// A fully assembled operation-log record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Classification label of the operation (never empty)
    pub event_type: String,

    /// Caller identity, empty when unknown
    pub username: String,

    /// Caller address as reported by the configured header
    pub ip: String,

    /// Redacted request/response summary
    pub content: String,

    pub result: Outcome,

    /// When the request was first observed, before the handler ran
    pub created_at: DateTime<Utc>,
}
