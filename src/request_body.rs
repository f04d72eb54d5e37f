//! Request body capture
//!
//! Reads the incoming payload before the handler runs and puts an
//! equivalent, unconsumed payload back so extractors still see the body.
//! The restored payload replays exactly what the client sent, read errors
//! included.

use actix_web::{
    dev::{Payload, ServiceRequest},
    error::PayloadError,
    web::{Bytes, BytesMut},
    HttpMessage,
};
use futures::{
    future,
    stream::{self, Stream, StreamExt},
};
use std::pin::Pin;

/// Buffer the request payload and restore it for downstream handlers
///
/// With a `limit`, a body that grows past it is not captured: the bytes read
/// so far are replayed ahead of the rest of the stream and an empty body is
/// returned. On a payload error the bytes read so far are returned, and the
/// handler receives them followed by the same error.
pub async fn capture_request_body(req: &mut ServiceRequest, limit: Option<usize>) -> Bytes {
    let mut payload = req.take_payload();
    let mut buffer = BytesMut::new();

    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(chunk) => {
                buffer.extend_from_slice(&chunk);
                if limit.is_some_and(|max| buffer.len() > max) {
                    tracing::debug!(?limit, "request body exceeds capture limit, not logging it");
                    req.set_payload(replay(buffer.freeze(), payload));
                    return Bytes::new();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body, logging what was received");
                let bytes = buffer.freeze();
                req.set_payload(replay(bytes.clone(), stream::once(future::ready(Err(e)))));
                return bytes;
            }
        }
    }

    let bytes = buffer.freeze();
    req.set_payload(restored_payload(bytes.clone()));
    bytes
}

fn restored_payload(bytes: Bytes) -> Payload {
    if bytes.is_empty() {
        return Payload::None;
    }
    Payload::from(bytes)
}

/// Payload yielding `head` (when non-empty) and then everything `tail` yields
fn replay<S>(head: Bytes, tail: S) -> Payload
where
    S: Stream<Item = Result<Bytes, PayloadError>> + 'static,
{
    let head = (!head.is_empty()).then_some(Ok(head));
    let payload: Pin<Box<dyn Stream<Item = Result<Bytes, PayloadError>>>> =
        Box::pin(stream::iter(head).chain(tail));
    Payload::Stream { payload }
}
