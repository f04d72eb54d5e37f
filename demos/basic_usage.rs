//! Basic usage example for the operation-log middleware
//!
//! Run with:
//! ```bash
//! RUST_LOG=oplog=info,oplog_actix=debug cargo run --example basic_usage
//! ```
//!
//! Set `OPLOG_COLLECTOR_URL` and `OPLOG_API_KEY` to ship records to a
//! collector instead of the tracing output.

use actix_web::{web, App, HttpMessage, HttpRequest, HttpResponse, HttpServer};
use oplog_actix::prelude::*;
use oplog_actix::{CollectorConfig, HttpSink, TracingSink};
use tracing_subscriber::EnvFilter;

async fn login(req: HttpRequest, body: web::Json<serde_json::Value>) -> HttpResponse {
    let username = body.get("username").and_then(|v| v.as_str()).unwrap_or_default();
    req.extensions_mut().insert(Actor::new(username));

    HttpResponse::Ok().json(serde_json::json!({ "code": 0, "token": "demo-token" }))
}

async fn reset_password() -> HttpResponse {
    // Explicit fields for a route that is not in the classification table
    HttpResponse::Ok()
        .append_header(log_field(LogField::EventType, "reset_password"))
        .append_header(log_field(LogField::Content, "reset link sent"))
        .append_header(log_field(LogField::Result, "1"))
        .json(serde_json::json!({ "code": 0 }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

fn oplog_config() -> OpLogConfig {
    let config = OpLogConfig::new()
        .with_event_types([("POST_/api/login", "login")])
        .with_redaction(
            RedactionTable::new()
                .with_fixed("password", "******")
                .with_fixed("token", "[REDACTED]")
                .with_fixed("idNum", "xxxxxx"),
        );

    let collector = CollectorConfig::from_env();
    if !collector.active {
        return config.with_sink(TracingSink);
    }
    match HttpSink::new(collector) {
        Ok(sink) => config.with_sink(sink),
        Err(e) => {
            tracing::warn!(error = %e, "collector sink unavailable, using tracing sink");
            config.with_sink(TracingSink)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = std::sync::Arc::new(oplog_config());

    tracing::info!("starting example server on http://0.0.0.0:8080");
    tracing::info!("try: curl -XPOST localhost:8080/api/login -H 'content-type: application/json' -d '{{\"username\":\"test\",\"password\":\"abcdefg\"}}'");

    HttpServer::new(move || {
        App::new()
            .wrap(OpLogMiddleware::from_arc(config.clone()))
            .service(web::resource("/api/login").route(web::post().to(login)))
            .service(web::resource("/api/password/reset").route(web::post().to(reset_password)))
            .service(web::resource("/health").route(web::get().to(health)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
