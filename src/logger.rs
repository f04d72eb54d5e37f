//! Record delivery
//!
//! Records are handed to a pluggable [`LogSink`] from a detached task so the
//! response path never waits on logging:
//! 1. The response capture spawns one task per logged request
//! 2. The task assembles the record and forwards it to the sink
//! 3. Sink errors and panics are reported through `tracing`, never re-raised

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::Instrument;

use crate::error::LogError;
use crate::record::LogRecord;

/// Destination for assembled records
///
/// Sinks receive records from many requests concurrently and in no
/// particular order.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn handle(&self, record: LogRecord) -> Result<(), LogError>;
}

/// Default sink: emits each record as a structured `tracing` event on the
/// `oplog` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    async fn handle(&self, record: LogRecord) -> Result<(), LogError> {
        tracing::info!(
            target: "oplog",
            event_type = %record.event_type,
            username = %record.username,
            ip = %record.ip,
            result = record.result.code(),
            created_at = %record.created_at.to_rfc3339(),
            content = %record.content,
            "operation logged"
        );
        Ok(())
    }
}

/// Sink backed by an async closure
pub struct FnSink<F>(F);

/// Wrap an async closure as a [`LogSink`]
///
/// ```rust
/// use oplog_actix::logger::sink_fn;
///
/// let sink = sink_fn(|record| async move {
///     println!("{}", record.event_type);
///     Ok(())
/// });
/// # let _ = sink;
/// ```
pub fn sink_fn<F, Fut>(handler: F) -> FnSink<F>
where
    F: Fn(LogRecord) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), LogError>> + Send + 'static,
{
    FnSink(handler)
}

#[async_trait]
impl<F, Fut> LogSink for FnSink<F>
where
    F: Fn(LogRecord) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), LogError>> + Send + 'static,
{
    async fn handle(&self, record: LogRecord) -> Result<(), LogError> {
        (self.0)(record).await
    }
}

/// Hand a record to the sink, reporting failures instead of returning them
pub async fn forward_log(record: LogRecord, sink: &dyn LogSink) {
    let event_type = record.event_type.clone();
    match sink.handle(record).await {
        Ok(()) => tracing::debug!(%event_type, "operation log delivered"),
        Err(e) => tracing::error!(%event_type, error = %e, "failed to deliver operation log"),
    }
}

/// Run `task` on a detached tokio task. Panics inside it are caught and
/// reported; the caller never awaits the outcome.
///
/// Outside a tokio runtime the task is dropped with a warning.
pub fn spawn_detached<F>(request_id: String, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(%request_id, "no async runtime available, operation log dropped");
        return;
    };

    let span = tracing::debug_span!("oplog", %request_id);
    handle.spawn(
        async move {
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                tracing::error!(panic = %panic_message(&*panic), "operation log task panicked");
            }
        }
        .instrument(span),
    );
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}
