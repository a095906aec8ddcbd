//! Per-invocation execution context handed to tool handlers.
//!
//! A [`Context`] lets a handler report progress, read other resources and
//! send leveled log messages to the client. Outgoing notifications go onto
//! an unbounded channel owned by the server, which drains it onto the
//! transport before writing the response of the request that raised them.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::capability::definition::ResourceBody;
use crate::capability::error::{CapabilityError, CapabilityResult};
use crate::mcp::protocol::{LoggingLevel, OutgoingNotification, ProgressToken};
use crate::registry::ResourceRegistry;

/// Sending half of the server's notification queue, plus the client's
/// minimum logging level.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<OutgoingNotification>,
    min_level: Arc<AtomicU8>,
}

impl Notifier {
    /// Creates a notifier and the receiver the server drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutgoingNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Self {
            tx,
            min_level: Arc::new(AtomicU8::new(LoggingLevel::Debug.as_u8())),
        };
        (notifier, rx)
    }

    /// Queues a notification. Dropped silently once the server is gone.
    pub fn send(&self, notification: OutgoingNotification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification dropped, receiver closed");
        }
    }

    /// The minimum level the client wants to receive.
    #[must_use]
    pub fn min_level(&self) -> LoggingLevel {
        LoggingLevel::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    /// Sets the minimum level (`logging/setLevel`).
    pub fn set_min_level(&self, level: LoggingLevel) {
        self.min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Mirrors a log message to `tracing` and, if it meets the client's
    /// minimum level, queues it as `notifications/message`.
    pub fn log(&self, level: LoggingLevel, message: &str, logger: Option<&str>) {
        let logger_name = logger.unwrap_or("");
        match level {
            LoggingLevel::Debug => debug!(logger = logger_name, "{message}"),
            LoggingLevel::Info | LoggingLevel::Notice => info!(logger = logger_name, "{message}"),
            LoggingLevel::Warning => warn!(logger = logger_name, "{message}"),
            _ => error!(logger = logger_name, level = %level, "{message}"),
        }

        if level >= self.min_level() {
            self.send(OutgoingNotification::log_message(level, message, logger));
        }
    }
}

/// Execution context for one tool invocation.
#[derive(Debug, Clone)]
pub struct Context {
    notifier: Notifier,
    resources: Arc<ResourceRegistry>,
    progress_token: Option<ProgressToken>,
    meta: Value,
}

impl Context {
    /// Creates a context.
    #[must_use]
    pub const fn new(
        notifier: Notifier,
        resources: Arc<ResourceRegistry>,
        progress_token: Option<ProgressToken>,
        meta: Value,
    ) -> Self {
        Self {
            notifier,
            resources,
            progress_token,
            meta,
        }
    }

    /// The caller's progress token, if one was supplied.
    #[must_use]
    pub const fn progress_token(&self) -> Option<&ProgressToken> {
        self.progress_token.as_ref()
    }

    /// The request's `_meta` object (`null` when absent).
    #[must_use]
    pub const fn meta(&self) -> &Value {
        &self.meta
    }

    /// Sends a progress notification. No-op without a progress token.
    pub fn report_progress(&self, progress: f64, total: Option<f64>) {
        if let Some(token) = &self.progress_token {
            self.notifier
                .send(OutgoingNotification::progress(token, progress, total));
        }
    }

    /// Reads another resource through the shared registry.
    ///
    /// # Errors
    ///
    /// Propagates [`CapabilityError::ResourceNotFound`] and handler failures.
    pub async fn read_resource(&self, uri: &str) -> CapabilityResult<ResourceBody> {
        let result = self.resources.get(uri).await?;
        result
            .contents
            .into_iter()
            .next()
            .map(|contents| contents.body)
            .ok_or_else(|| CapabilityError::ResourceNotFound {
                uri: uri.to_string(),
            })
    }

    /// Sends a log message at `level`.
    pub fn log(&self, level: LoggingLevel, message: &str, logger: Option<&str>) {
        self.notifier.log(level, message, logger);
    }

    /// Debug-level log message.
    pub fn debug(&self, message: &str, logger: Option<&str>) {
        self.log(LoggingLevel::Debug, message, logger);
    }

    /// Info-level log message.
    pub fn info(&self, message: &str, logger: Option<&str>) {
        self.log(LoggingLevel::Info, message, logger);
    }

    /// Notice-level log message.
    pub fn notice(&self, message: &str, logger: Option<&str>) {
        self.log(LoggingLevel::Notice, message, logger);
    }

    /// Warning-level log message.
    pub fn warning(&self, message: &str, logger: Option<&str>) {
        self.log(LoggingLevel::Warning, message, logger);
    }

    /// Error-level log message.
    pub fn error(&self, message: &str, logger: Option<&str>) {
        self.log(LoggingLevel::Error, message, logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ResourceDefinition;
    use crate::registry::DuplicatePolicy;
    use serde_json::json;

    fn context(
        token: Option<ProgressToken>,
    ) -> (Context, mpsc::UnboundedReceiver<OutgoingNotification>) {
        let (notifier, rx) = Notifier::channel();
        let resources = Arc::new(ResourceRegistry::new(DuplicatePolicy::Overwrite));
        resources
            .add_resource(
                ResourceDefinition::builder("dir://desktop")
                    .handler(|| async { Ok("file://desktop/file1.txt") })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        (Context::new(notifier, resources, token, Value::Null), rx)
    }

    #[test]
    fn progress_without_token_is_silent() {
        let (ctx, mut rx) = context(None);
        ctx.report_progress(50.0, Some(100.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn progress_with_token_is_sent() {
        let (ctx, mut rx) = context(Some(ProgressToken::String("tok".to_string())));
        ctx.report_progress(50.0, Some(100.0));
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.method, "notifications/progress");
        assert_eq!(sent.params.unwrap()["progressToken"], json!("tok"));
    }

    #[test]
    fn log_respects_min_level() {
        let (ctx, mut rx) = context(None);
        ctx.notifier.set_min_level(LoggingLevel::Warning);
        ctx.info("hidden", None);
        assert!(rx.try_recv().is_err());

        ctx.error("shown", Some("test"));
        let sent = rx.try_recv().unwrap();
        assert_eq!(
            sent.params,
            Some(json!({"level": "error", "data": "shown", "logger": "test"}))
        );
    }

    #[tokio::test]
    async fn read_resource_through_registry() {
        let (ctx, _rx) = context(None);
        let body = ctx.read_resource("dir://desktop").await.unwrap();
        assert_eq!(body.as_text(), Some("file://desktop/file1.txt"));

        let err = ctx.read_resource("dir://missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
