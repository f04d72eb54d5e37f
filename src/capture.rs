//! Response capture
//!
//! [`ResponseCapture`] records the status, the override header lines and the
//! first body chunk of one response, and fires record assembly exactly once.
//! [`CaptureBody`] wraps the real response body and feeds every chunk it
//! streams to the capture while passing the bytes through unchanged.
//!
//! Only the first chunk becomes the logged response body. Streamed responses
//! are therefore logged from their first chunk alone.

use actix_web::{
    body::{BodySize, BoxBody, MessageBody},
    http::{header::HeaderMap, StatusCode},
    web::Bytes,
};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::assemble::{assemble, RequestSnapshot};
use crate::config::OpLogConfig;
use crate::fields::OverrideSet;
use crate::logger::{forward_log, spawn_detached};

/// State that moves into the logging task when the capture fires
struct Pending {
    request: RequestSnapshot,
    overrides: Option<OverrideSet>,
}

/// Per-request capture state. Fires at most once: on the first body chunk,
/// or when dropped without ever seeing one.
pub struct ResponseCapture {
    request_id: String,
    config: Arc<OpLogConfig>,
    status: StatusCode,
    pending: Option<Pending>,
}

impl ResponseCapture {
    pub fn new(request: RequestSnapshot, config: Arc<OpLogConfig>, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            config,
            status: StatusCode::OK,
            pending: Some(Pending {
                request,
                overrides: None,
            }),
        }
    }

    /// Record the response status
    pub fn write_header(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Decode the override lines carried by `headers` and remove them.
    ///
    /// The header is stripped even when the capture has already fired.
    pub fn take_overrides(&mut self, headers: &mut HeaderMap) {
        let overrides = OverrideSet::take_from_headers(headers);
        if let Some(pending) = self.pending.as_mut() {
            if overrides.is_some() {
                pending.overrides = overrides;
            }
        }
    }

    /// Observe one body chunk. Returns `true` if this call fired the capture.
    pub fn write(&mut self, chunk: &Bytes) -> bool {
        self.fire(chunk.clone())
    }

    pub fn has_fired(&self) -> bool {
        self.pending.is_none()
    }

    fn fire(&mut self, body: Bytes) -> bool {
        let Some(Pending { request, overrides }) = self.pending.take() else {
            return false;
        };

        let config = self.config.clone();
        let status = self.status;
        spawn_detached(self.request_id.clone(), async move {
            match assemble(&request, status, &body, overrides.as_ref(), &config) {
                Some(record) => forward_log(record, config.sink.as_ref()).await,
                None => tracing::trace!(
                    method = %request.method,
                    path = %request.path,
                    "no event type for request, not logged"
                ),
            }
        });
        true
    }
}

impl Drop for ResponseCapture {
    fn drop(&mut self) {
        // Bodies that are never polled (empty or size-less) still get one record.
        self.fire(Bytes::new());
    }
}

/// Response body decorator that forwards every chunk untouched
pub struct CaptureBody {
    body: BoxBody,
    capture: ResponseCapture,
}

impl CaptureBody {
    pub fn new(body: BoxBody, capture: ResponseCapture) -> Self {
        Self { body, capture }
    }
}

impl MessageBody for CaptureBody {
    type Error = <BoxBody as MessageBody>::Error;

    fn size(&self) -> BodySize {
        self.body.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.get_mut();

        match Pin::new(&mut this.body).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.capture.write(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
