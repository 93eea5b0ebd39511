//! Kafka transport built on rdkafka's `StreamConsumer`.
//!
//! A pump task moves messages from the consumer into the bounded record
//! channel. Client errors and rebalance events arrive through the consumer
//! context and are pushed into the unbounded side channels.

use super::{Transport, TransportChannels};
use crate::config::ConsumerConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use kafka_types::{partition_map, Notification, PartitionMap, RawRecord};
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{
    BaseConsumer, CommitMode, Consumer as RdkafkaConsumer, ConsumerContext, Rebalance,
    StreamConsumer as RdkafkaStreamConsumer,
};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Headers, Message};
use rdkafka::TopicPartitionList;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type StreamConsumer = RdkafkaStreamConsumer<KafkaContext>;

/// Consumer context forwarding client errors and rebalances to channels.
pub struct KafkaContext {
    errors: Mutex<Option<mpsc::UnboundedSender<Error>>>,
    notifications: Mutex<Option<mpsc::UnboundedSender<Notification>>>,
}

impl KafkaContext {
    fn new(
        errors: mpsc::UnboundedSender<Error>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            errors: Mutex::new(Some(errors)),
            notifications: Mutex::new(Some(notifications)),
        }
    }

    fn send_error(&self, error: Error) {
        let errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = errors.as_ref() {
            let _ = tx.send(error);
        }
    }

    fn send_notification(&self, notification: Notification) {
        let notifications = self
            .notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = notifications.as_ref() {
            let _ = tx.send(notification);
        }
    }

    /// Drop both senders so that their receivers observe end of stream.
    fn shutdown(&self) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl ClientContext for KafkaContext {
    fn error(&self, error: KafkaError, reason: &str) {
        warn!(error = %error, reason, "Kafka client error");
        self.send_error(Error::Kafka(error));
    }
}

impl ConsumerContext for KafkaContext {
    fn pre_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        match rebalance {
            Rebalance::Revoke(tpl) => {
                let released = to_partition_map(tpl);
                info!(?released, "Rebalance started, partitions revoked");
                self.send_notification(Notification::rebalance_start(released));
            }
            Rebalance::Assign(_) => {}
            Rebalance::Error(e) => {
                error!(error = %e, "Rebalance failed");
                self.send_notification(Notification::rebalance_error(e.to_string()));
            }
        }
    }

    fn post_rebalance(&self, base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        if let Rebalance::Assign(tpl) = rebalance {
            let claimed = to_partition_map(tpl);
            let current = match base_consumer.assignment() {
                Ok(assignment) => to_partition_map(&assignment),
                Err(e) => {
                    warn!(error = %e, "Failed to read assignment after rebalance");
                    claimed.clone()
                }
            };
            info!(?claimed, "Rebalance complete, partitions assigned");
            self.send_notification(Notification::rebalance_ok(claimed, current));
        }
    }
}

fn to_partition_map(tpl: &TopicPartitionList) -> PartitionMap {
    let elements = tpl.elements();
    partition_map(elements.iter().map(|e| (e.topic(), e.partition())))
}

/// Kafka-backed [`Transport`].
pub struct KafkaTransport {
    consumer: Arc<StreamConsumer>,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

impl KafkaTransport {
    /// Create a consumer in `group_id`, verify the brokers answer a metadata
    /// request for `topic`, subscribe, and start the pump task.
    pub async fn connect(
        brokers: &[String],
        topic: &str,
        group_id: &str,
        config: &ConsumerConfig,
    ) -> Result<(Self, TransportChannels)> {
        config.validate()?;
        if brokers.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one Kafka broker is required".to_string(),
            ));
        }

        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        let context = KafkaContext::new(errors_tx, notifications_tx);

        let mut client_config = ClientConfig::new();
        for (key, value) in config.client_settings(brokers, group_id) {
            client_config.set(key, value);
        }
        let consumer: StreamConsumer = client_config
            .create_with_context(context)
            .map_err(|e| Error::Connection(format!("Failed to create consumer: {e}")))?;
        let consumer = Arc::new(consumer);

        let metadata_consumer = Arc::clone(&consumer);
        let metadata_topic = topic.to_string();
        let timeout = config.connect_timeout;
        tokio::task::spawn_blocking(move || {
            metadata_consumer
                .fetch_metadata(Some(&metadata_topic), timeout)
                .map(|_| ())
        })
        .await
        .map_err(|e| Error::Connection(format!("Metadata check task failed: {e}")))?
        .map_err(|e| Error::Connection(format!("Failed to reach Kafka brokers: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| Error::Connection(format!("Failed to subscribe to topic: {e}")))?;

        info!(topic, group_id, "Subscribed to Kafka topic");

        let (records_tx, records_rx) = mpsc::channel(config.channel_buffer_size);
        let shutdown = CancellationToken::new();
        tokio::spawn(pump(Arc::clone(&consumer), records_tx, shutdown.clone()));

        let transport = Self {
            consumer,
            shutdown,
            closed: AtomicBool::new(false),
        };
        let channels = TransportChannels {
            records: records_rx,
            errors: Some(errors_rx),
            notifications: Some(notifications_rx),
        };

        Ok((transport, channels))
    }
}

async fn pump(
    consumer: Arc<StreamConsumer>,
    records: mpsc::Sender<RawRecord>,
    shutdown: CancellationToken,
) {
    loop {
        let record = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = consumer.recv() => match result {
                Ok(msg) => to_raw_record(&msg),
                Err(e) => {
                    consumer.context().send_error(Error::Kafka(e));
                    continue;
                }
            },
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            sent = records.send(record) => {
                if sent.is_err() {
                    debug!("Record receiver dropped, stopping Kafka pump");
                    break;
                }
            }
        }
    }
    debug!("Kafka pump stopped");
}

fn to_raw_record(msg: &RdkafkaBorrowedMessage<'_>) -> RawRecord {
    let headers = msg
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|h| (h.key.to_string(), h.value.map(<[u8]>::to_vec).unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    RawRecord {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(|k| k.to_vec()),
        payload: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
        headers,
        timestamp: msg
            .timestamp()
            .to_millis()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
    }
}

impl Transport for KafkaTransport {
    fn acknowledge(&self, record: &RawRecord) -> Result<()> {
        self.consumer
            .store_offset(&record.topic, record.partition, record.offset + 1)
            .map_err(|e| {
                Error::Transport(format!(
                    "Failed to store offset {} for {}/{}: {e}",
                    record.offset + 1,
                    record.topic,
                    record.partition
                ))
            })
    }

    /// Commits stored offsets synchronously, so this blocks the calling
    /// thread until the broker answers.
    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let commit = match self.consumer.commit_consumer_state(CommitMode::Sync) {
            Ok(()) | Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => Ok(()),
            Err(e) => Err(Error::Transport(format!("Failed to commit offsets: {e}"))),
        };

        self.consumer.unsubscribe();
        self.shutdown.cancel();
        self.consumer.context().shutdown();

        info!("Kafka transport closed");
        commit
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
