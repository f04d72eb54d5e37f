//! # oplog-actix
//!
//! Operation/audit logging middleware for Actix-Web applications.
//!
//! The middleware observes the request body and the response status/body of
//! selected routes, derives one structured [`LogRecord`] per request and hands
//! it to a pluggable [`LogSink`] in the background:
//!
//! - **Non-blocking**: records are assembled and delivered on a detached task
//! - **Fail-safe**: malformed bodies, sink errors and panics are reported via
//!   `tracing` and never reach the client
//! - **Non-intrusive**: status, body and headers reach the client unchanged,
//!   apart from the internal `M-Log-Key` override header which is always stripped
//! - **Redacting**: configured fields are masked at any depth of JSON bodies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpResponse, HttpServer};
//! use oplog_actix::{OpLogConfig, OpLogMiddleware, RedactionTable};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| {
//!         let config = OpLogConfig::new()
//!             .with_event_type("POST", "/api/login", "login")
//!             .with_redaction(RedactionTable::new().with_fixed("password", "******"));
//!
//!         App::new()
//!             .wrap(OpLogMiddleware::new(config))
//!             .route("/api/login", web::post().to(|| async {
//!                 HttpResponse::Ok().json(serde_json::json!({ "code": 0 }))
//!             }))
//!     })
//!     .bind("0.0.0.0:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! ## How It Works
//!
//! 1. The middleware buffers the request body and restores it for the handler
//! 2. The handler runs and may append `M-Log-Key: Field=value` overrides
//! 3. Overrides are decoded and stripped before the response leaves the middleware
//! 4. The first body chunk fires record assembly on a background task
//! 5. The event type comes from an override or the `METHOD_path` table; without
//!    one the request is not logged
//! 6. The record goes to the configured sink; failures are only traced
//!
//! ## Architecture
//!
//! - `middleware`: Actix-Web middleware and the [`Actor`] request extension
//! - `capture`: response capture and body decorator
//! - `request_body`: request body buffering
//! - `assemble`: record assembly and outcome classification
//! - `redact`: recursive field redaction
//! - `fields`: override header codec
//! - `record`: the log record
//! - `logger`: sink trait, default sinks and background delivery
//! - `client`: HTTP collector sink
//! - `config`: composition and collector configuration
//! - `error`: error types

pub mod assemble;
pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod logger;
pub mod middleware;
pub mod prelude;
pub mod record;
pub mod redact;
pub mod request_body;
pub mod utils;

pub use client::HttpSink;
pub use config::{CollectorConfig, OpLogConfig};
pub use error::LogError;
pub use fields::{add_log_field, log_field, LogField};
pub use logger::{sink_fn, LogSink, TracingSink};
pub use middleware::{Actor, OpLogMiddleware};
pub use record::{LogRecord, Outcome};
pub use redact::RedactionTable;
