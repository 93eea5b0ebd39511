//! In-memory transport.
//!
//! Records, errors and notifications are pushed by the owner of the
//! [`InMemoryTransport`] handle and acknowledgments are recorded for later
//! inspection. Useful for embedding the consumer behind a non-Kafka source.

use super::{Transport, TransportChannels};
use crate::error::{Error, Result};
use kafka_types::{Notification, RawRecord};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

struct Senders {
    records: mpsc::Sender<RawRecord>,
    errors: mpsc::UnboundedSender<Error>,
    notifications: mpsc::UnboundedSender<Notification>,
}

/// Transport backed by tokio channels.
pub struct InMemoryTransport {
    senders: Mutex<Option<Senders>>,
    acknowledged: Mutex<Vec<(String, i32, i64)>>,
}

impl InMemoryTransport {
    /// Create a transport whose record channel holds up to `buffer` records.
    pub fn new(buffer: usize) -> (Self, TransportChannels) {
        let (records_tx, records_rx) = mpsc::channel(buffer.max(1));
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();

        let transport = Self {
            senders: Mutex::new(Some(Senders {
                records: records_tx,
                errors: errors_tx,
                notifications: notifications_tx,
            })),
            acknowledged: Mutex::new(Vec::new()),
        };
        let channels = TransportChannels {
            records: records_rx,
            errors: Some(errors_rx),
            notifications: Some(notifications_rx),
        };

        (transport, channels)
    }

    /// Push a record, waiting for channel capacity.
    pub async fn send_record(&self, record: RawRecord) -> Result<()> {
        let sender = self
            .senders()
            .as_ref()
            .map(|s| s.records.clone())
            .ok_or_else(closed)?;

        sender.send(record).await.map_err(|_| closed())
    }

    pub fn send_error(&self, error: Error) -> Result<()> {
        match self.senders().as_ref() {
            Some(s) => s.errors.send(error).map_err(|_| closed()),
            None => Err(closed()),
        }
    }

    pub fn send_notification(&self, notification: Notification) -> Result<()> {
        match self.senders().as_ref() {
            Some(s) => s.notifications.send(notification).map_err(|_| closed()),
            None => Err(closed()),
        }
    }

    /// `(topic, partition, offset)` of every acknowledged record, in order.
    pub fn acknowledged(&self) -> Vec<(String, i32, i64)> {
        self.acknowledged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn senders(&self) -> MutexGuard<'_, Option<Senders>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for InMemoryTransport {
    fn acknowledge(&self, record: &RawRecord) -> Result<()> {
        self.acknowledged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((record.topic.clone(), record.partition, record.offset));
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.senders().take().is_some() {
            debug!("In-memory transport closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.senders().is_none()
    }
}

fn closed() -> Error {
    Error::Transport("Transport is closed".to_string())
}
