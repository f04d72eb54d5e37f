//! Actix-Web middleware that installs the response capture
//!
//! For every request the middleware buffers the request body, runs the
//! inner service, strips the override header from the response and wraps
//! the response body in a [`CaptureBody`]. It never changes the status,
//! the body or any other header.

use actix_web::{
    body::MessageBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::assemble::RequestSnapshot;
use crate::capture::{CaptureBody, ResponseCapture};
use crate::config::OpLogConfig;
use crate::request_body::capture_request_body;
use crate::utils::{current_time, generate_request_id};

/// Authenticated caller, inserted into request extensions by an upstream
/// authentication layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
}

impl Actor {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Operation-log middleware for Actix-Web
///
/// ```rust,no_run
/// use actix_web::App;
/// use oplog_actix::{OpLogConfig, OpLogMiddleware};
///
/// let config = OpLogConfig::new().with_event_type("POST", "/api/login", "login");
/// let app = App::new().wrap(OpLogMiddleware::new(config));
/// ```
pub struct OpLogMiddleware {
    config: Arc<OpLogConfig>,
}

impl OpLogMiddleware {
    pub fn new(config: OpLogConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_arc(config: Arc<OpLogConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OpLogConfig {
        &self.config
    }
}

impl Default for OpLogMiddleware {
    fn default() -> Self {
        Self::new(OpLogConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for OpLogMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<CaptureBody>;
    type Error = Error;
    type InitError = ();
    type Transform = OpLogMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(OpLogMiddlewareService {
            service: Rc::new(service),
            config: self.config.clone(),
        })
    }
}

/// The service that handles each request
pub struct OpLogMiddlewareService<S> {
    service: Rc<S>,
    config: Arc<OpLogConfig>,
}

impl<S, B> Service<ServiceRequest> for OpLogMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<CaptureBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();
        let started_at = current_time();
        let request_id = generate_request_id();

        Box::pin(async move {
            let body = capture_request_body(&mut req, config.max_body_size).await;
            let mut snapshot = RequestSnapshot {
                body,
                source_address: header_value(&req, &config.ip_header),
                started_at,
                ..RequestSnapshot::new(req.method().as_str(), req.path())
            };

            let res = service.call(req).await?;

            snapshot.actor = res
                .request()
                .extensions()
                .get::<Actor>()
                .map(|actor| actor.username.clone());

            let mut capture = ResponseCapture::new(snapshot, config, request_id);
            let res = res.map_into_boxed_body().map_body(move |head, body| {
                capture.write_header(head.status);
                capture.take_overrides(&mut head.headers);
                CaptureBody::new(body, capture)
            });

            Ok(res)
        })
    }
}

fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
