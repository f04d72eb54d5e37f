//! Convenience re-exports for easy importing
//!
//! ```rust
//! use oplog_actix::prelude::*;
//! ```

pub use crate::config::OpLogConfig;
pub use crate::error::LogError;
pub use crate::fields::{log_field, LogField};
pub use crate::logger::{sink_fn, LogSink};
pub use crate::middleware::{Actor, OpLogMiddleware};
pub use crate::record::{LogRecord, Outcome};
pub use crate::redact::RedactionTable;
