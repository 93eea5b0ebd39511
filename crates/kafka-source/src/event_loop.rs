//! The consumer's event loop.
//!
//! One task selects between the record stream and the shutdown token. Errors
//! and notifications are drained by their own tasks, which run until the
//! transport closes the corresponding channel.

use crate::callbacks::ConsumerCallbacks;
use crate::consumer::ConsumerState;
use crate::decoder::decode_record;
use crate::registry::SchemaResolver;
use crate::transport::{Transport, TransportChannels};
use kafka_types::RawRecord;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Counters for one run of the event loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    /// Records taken from the transport
    pub received: u64,
    /// Records decoded and handed to the data callback
    pub decoded: u64,
    /// Records whose decoding failed
    pub failed: u64,
    /// Records acknowledged without a transport error
    pub acknowledged: u64,
}

pub(crate) struct EventLoop {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) resolver: Arc<dyn SchemaResolver>,
    pub(crate) callbacks: ConsumerCallbacks,
    pub(crate) return_errors: bool,
    pub(crate) return_notifications: bool,
}

impl EventLoop {
    /// Run until `shutdown` fires or the record stream ends.
    ///
    /// The record being processed when shutdown is observed is finished and
    /// acknowledged; records still queued are left untouched. The same holds
    /// once the transport has been closed.
    pub(crate) async fn run(
        &self,
        channels: TransportChannels,
        shutdown: CancellationToken,
        state: &watch::Sender<ConsumerState>,
    ) -> ConsumeStats {
        let TransportChannels {
            mut records,
            errors,
            notifications,
        } = channels;

        // A disabled stream's receiver is dropped here, so the transport
        // sees it as closed.
        if let (true, Some(mut errors)) = (self.return_errors, errors) {
            let callbacks = self.callbacks.clone();
            tokio::spawn(async move {
                while let Some(error) = errors.recv().await {
                    callbacks.error(error);
                }
                debug!("Transport error stream closed");
            });
        }

        if let (true, Some(mut notifications)) = (self.return_notifications, notifications) {
            let callbacks = self.callbacks.clone();
            tokio::spawn(async move {
                while let Some(notification) = notifications.recv().await {
                    callbacks.notification(notification);
                }
                debug!("Notification stream closed");
            });
        }

        let mut stats = ConsumeStats::default();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, leaving event loop");
                    break;
                }
                record = records.recv() => match record {
                    // buffered past close; acknowledging would fail
                    Some(_) if self.transport.is_closed() => {
                        info!("Transport closed, leaving event loop");
                        break;
                    }
                    Some(record) => self.handle(record, &mut stats).await,
                    None => {
                        info!("Record stream closed, leaving event loop");
                        break;
                    }
                },
            }
        }

        state.send_if_modified(|s| {
            if *s == ConsumerState::Running {
                *s = ConsumerState::Draining;
                true
            } else {
                false
            }
        });

        stats
    }

    async fn handle(&self, record: RawRecord, stats: &mut ConsumeStats) {
        stats.received += 1;

        match decode_record(&record, self.resolver.as_ref()).await {
            Ok(message) => {
                stats.decoded += 1;
                self.callbacks.data(message);
            }
            Err(e) => {
                stats.failed += 1;
                debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Failed to decode record"
                );
                self.callbacks.error(e);
            }
        }

        match self.transport.acknowledge(&record) {
            Ok(()) => stats.acknowledged += 1,
            Err(e) => self.callbacks.error(e),
        }
    }
}
