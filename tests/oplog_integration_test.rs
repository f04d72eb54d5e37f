use actix_web::{http::StatusCode, test, web, App, HttpMessage, HttpRequest, HttpResponse};
use futures::stream;
use oplog_actix::fields::LOG_FIELD_HEADER;
use oplog_actix::prelude::*;
use std::time::Duration;
use tokio::sync::mpsc;

const LOGIN_BODY: &str =
    r#"{"username":"test","password":"abcdefg","info":{"idNum":"111111111111111111"}}"#;

fn login_config() -> OpLogConfig {
    OpLogConfig::new()
        .with_event_types([("POST_/api/login", "login"), ("GET_/api/stream", "stream")])
        .with_redaction(
            RedactionTable::new()
                .with_fixed("password", "******")
                .with_fixed("idNum", "xxxxxx"),
        )
}

fn with_channel(config: OpLogConfig) -> (OpLogMiddleware, mpsc::UnboundedReceiver<LogRecord>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let config = config.with_sink(sink_fn(move |record| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(record);
            Ok(())
        }
    }));
    (OpLogMiddleware::new(config), rx)
}

async fn next_record(rx: &mut mpsc::UnboundedReceiver<LogRecord>) -> Option<LogRecord> {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .ok()
        .flatten()
}

async fn login(req: HttpRequest, body: web::Json<serde_json::Value>) -> HttpResponse {
    if let Some(name) = body.get("username").and_then(|v| v.as_str()) {
        req.extensions_mut().insert(Actor::new(name));
    }
    HttpResponse::Ok().json(serde_json::json!({ "code": 0 }))
}

#[actix_rt::test]
async fn test_login_is_logged_with_redacted_content() {
    let (middleware, mut rx) = with_channel(login_config());
    let app = test::init_service(
        App::new()
            .wrap(middleware)
            .route("/api/login", web::post().to(login)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .insert_header(("content-type", "application/json"))
        .insert_header(("X-Real-Ip", "192.0.2.10"))
        .set_payload(LOGIN_BODY)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, r#"{"code":0}"#);

    let record = next_record(&mut rx).await.expect("login record");
    assert_eq!(record.event_type, "login");
    assert_eq!(record.result, Outcome::Success);
    assert_eq!(record.username, "test");
    assert_eq!(record.ip, "192.0.2.10");
    assert!(record.content.contains("******"));
    assert!(record.content.contains("xxxxxx"));
    assert!(!record.content.contains("abcdefg"));
    assert!(!record.content.contains("111111111111111111"));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["eventType"], "login");
    assert_eq!(json["result"], 1);
    assert!(json["createdAt"].is_string());
}

#[actix_rt::test]
async fn test_streamed_response_is_logged_once_from_first_chunk() {
    let (middleware, mut rx) = with_channel(login_config());
    let app = test::init_service(App::new().wrap(middleware).route(
        "/api/stream",
        web::get().to(|| async {
            let chunks = vec![
                Ok::<_, std::io::Error>(web::Bytes::from_static(br#"{"code":0}"#)),
                Ok(web::Bytes::from_static(b"\n{\"code\":1}")),
                Ok(web::Bytes::from_static(b"\n{\"code\":2}")),
            ];
            HttpResponse::Ok().streaming(stream::iter(chunks))
        }),
    ))
    .await;

    let req = test::TestRequest::get().uri("/api/stream").to_request();
    let resp = test::call_service(&app, req).await;
    let body = test::read_body(resp).await;
    assert_eq!(body, "{\"code\":0}\n{\"code\":1}\n{\"code\":2}");

    let record = next_record(&mut rx).await.expect("one record");
    assert_eq!(record.event_type, "stream");
    assert_eq!(record.result, Outcome::Success);
    assert!(record.content.ends_with("response: {\"code\":0}"));
    assert!(next_record(&mut rx).await.is_none());
}

#[actix_rt::test]
async fn test_override_header_never_reaches_client() {
    let (middleware, mut rx) = with_channel(OpLogConfig::new());
    let app = test::init_service(App::new().wrap(middleware).route(
        "/api/noisy",
        web::post().to(|| async {
            let mut builder = HttpResponse::Ok();
            for i in 0..10 {
                builder.append_header(log_field(LogField::Content, format!("line {i}")));
            }
            builder
                .append_header(log_field(LogField::EventType, "noisy"))
                .append_header(("x-kept", "yes"))
                .finish()
        }),
    ))
    .await;

    let req = test::TestRequest::post().uri("/api/noisy").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get_all(LOG_FIELD_HEADER).count(), 0);
    assert_eq!(resp.headers().get("x-kept").unwrap(), "yes");
    drop(test::read_body(resp).await);

    let record = next_record(&mut rx).await.expect("record for empty body");
    assert_eq!(record.event_type, "noisy");
    assert!(record.content.ends_with("response: line 9"));
    // empty body and no result override
    assert_eq!(record.result, Outcome::Failure);
}

#[actix_rt::test]
async fn test_failing_sink_does_not_affect_response() {
    let config = login_config().with_sink(sink_fn(|_| async { Err(LogError::sink("unavailable")) }));
    let app = test::init_service(
        App::new()
            .wrap(OpLogMiddleware::new(config))
            .route("/api/login", web::post().to(login)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .insert_header(("content-type", "application/json"))
        .set_payload(LOGIN_BODY)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, r#"{"code":0}"#);
}

#[actix_rt::test]
async fn test_panicking_assertion_is_contained() {
    let (middleware, mut rx) = with_channel(login_config().with_outcome_assert(|_| panic!("bad assertion")));
    let app = test::init_service(
        App::new()
            .wrap(middleware)
            .route("/api/login", web::post().to(login)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .insert_header(("content-type", "application/json"))
        .set_payload(LOGIN_BODY)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(test::read_body(resp).await, r#"{"code":0}"#);

    assert!(next_record(&mut rx).await.is_none());
}

#[actix_rt::test]
async fn test_multi_line_override_keeps_handler_response() {
    let (middleware, mut rx) = with_channel(OpLogConfig::new());
    let app = test::init_service(App::new().wrap(middleware).route(
        "/api/report",
        web::post().to(|| async {
            HttpResponse::Ok()
                .append_header(log_field(LogField::EventType, "report"))
                .append_header(log_field(LogField::Content, "line1\nline2\r\n\tdone 100%"))
                .json(serde_json::json!({ "code": 0 }))
        }),
    ))
    .await;

    let req = test::TestRequest::post().uri("/api/report").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get_all(LOG_FIELD_HEADER).count(), 0);
    assert_eq!(test::read_body(resp).await, r#"{"code":0}"#);

    let record = next_record(&mut rx).await.expect("report record");
    assert_eq!(record.event_type, "report");
    assert!(record.content.ends_with("response: line1\nline2\r\n\tdone 100%"));
    assert_eq!(record.result, Outcome::Success);
}
