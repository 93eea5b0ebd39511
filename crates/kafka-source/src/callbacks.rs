//! Application callbacks.
//!
//! All three callbacks are optional. An event without a matching callback is
//! dropped; a record-level error without an error callback is logged instead.

use crate::error::Error;
use kafka_types::{DecodedMessage, Notification};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Type alias for the decoded message handler
pub type DataCallback = Arc<dyn Fn(DecodedMessage) + Send + Sync>;

/// Type alias for the error handler
pub type ErrorCallback = Arc<dyn Fn(Error) + Send + Sync>;

/// Type alias for the rebalance notification handler
pub type NotificationCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// Handlers invoked by the consumer's event loop.
///
/// Callbacks run on the consumer's tasks: the data callback on the event loop
/// task, the others on their drain tasks. A slow callback slows its stream.
#[derive(Clone, Default)]
pub struct ConsumerCallbacks {
    pub on_data_received: Option<DataCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_notification: Option<NotificationCallback>,
}

impl ConsumerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_data_received<F>(mut self, f: F) -> Self
    where
        F: Fn(DecodedMessage) + Send + Sync + 'static,
    {
        self.on_data_received = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_notification<F>(mut self, f: F) -> Self
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.on_notification = Some(Arc::new(f));
        self
    }

    pub(crate) fn data(&self, message: DecodedMessage) {
        if let Some(f) = &self.on_data_received {
            f(message);
        }
    }

    /// Deliver an error, logging it when no error callback is set.
    pub(crate) fn error(&self, error: Error) {
        match &self.on_error {
            Some(f) => f(error),
            None => warn!(error = %error, "Dropped consumer error, no error callback set"),
        }
    }

    pub(crate) fn notification(&self, notification: Notification) {
        if let Some(f) = &self.on_notification {
            f(notification);
        }
    }
}

impl fmt::Debug for ConsumerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCallbacks")
            .field("on_data_received", &self.on_data_received.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_notification", &self.on_notification.is_some())
            .finish()
    }
}
