//! Consumer lifecycle.
//!
//! A [`Consumer`] owns a transport, a schema resolver and the application
//! callbacks. [`Consumer::consume`] runs the event loop once;
//! [`Consumer::close`] releases the transport.

use crate::callbacks::ConsumerCallbacks;
use crate::codec::AvroCodec;
use crate::config::ConsumerConfig;
use crate::decoder::decode_record;
use crate::error::{Error, Result};
use crate::event_loop::{ConsumeStats, EventLoop};
use crate::registry::{CachedSchemaRegistryClient, SchemaResolver};
use crate::transport::{KafkaTransport, Transport, TransportChannels};
use kafka_types::{DecodedMessage, RawRecord};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lifecycle state of a [`Consumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Constructed, event loop not started
    Idle,
    /// Event loop is selecting records
    Running,
    /// Event loop observed shutdown or end of stream
    Draining,
    /// Event loop has returned
    Terminated,
    /// Transport released
    Closed,
}

/// Schema-registry aware Avro consumer.
pub struct Consumer {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn SchemaResolver>,
    callbacks: ConsumerCallbacks,
    config: ConsumerConfig,
    channels: Mutex<Option<TransportChannels>>,
    state: watch::Sender<ConsumerState>,
}

impl Consumer {
    /// Connect to Kafka and the schema registry.
    ///
    /// Subscribes to `topic` as a member of `group_id`. Fails with
    /// [`Error::Connection`] when either side cannot be reached or
    /// configured.
    pub async fn connect(
        brokers: &[String],
        registry_urls: &[String],
        topic: &str,
        group_id: &str,
        callbacks: ConsumerCallbacks,
        config: ConsumerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let registry = CachedSchemaRegistryClient::new(registry_urls, config.registry_timeout)?;
        let (transport, channels) =
            KafkaTransport::connect(brokers, topic, group_id, &config).await?;

        info!(topic, group_id, "Avro consumer connected");

        Ok(Self::from_parts(
            Arc::new(transport),
            channels,
            Arc::new(registry),
            callbacks,
            config,
        ))
    }

    /// [`Consumer::connect`] with [`ConsumerConfig::default`]: errors and
    /// notifications enabled, starting from the oldest offset.
    pub async fn connect_with_defaults(
        brokers: &[String],
        registry_urls: &[String],
        topic: &str,
        group_id: &str,
        callbacks: ConsumerCallbacks,
    ) -> Result<Self> {
        Self::connect(
            brokers,
            registry_urls,
            topic,
            group_id,
            callbacks,
            ConsumerConfig::default(),
        )
        .await
    }

    /// Assemble a consumer from an already connected transport and resolver.
    pub fn from_parts(
        transport: Arc<dyn Transport>,
        channels: TransportChannels,
        resolver: Arc<dyn SchemaResolver>,
        callbacks: ConsumerCallbacks,
        config: ConsumerConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self {
            transport,
            resolver,
            callbacks,
            config,
            channels: Mutex::new(Some(channels)),
            state,
        }
    }

    /// Resolve the codec for a schema id.
    pub async fn get_schema(&self, schema_id: u32) -> Result<Arc<AvroCodec>> {
        self.resolver.resolve(schema_id).await
    }

    /// Decode a single record without going through the event loop.
    ///
    /// Nothing is acknowledged and no callback is invoked.
    pub async fn process_record(&self, record: &RawRecord) -> Result<DecodedMessage> {
        decode_record(record, self.resolver.as_ref()).await
    }

    /// Run the event loop until `shutdown` is cancelled or the transport
    /// stops delivering records.
    ///
    /// May be called once. The transport stays open afterwards; call
    /// [`Consumer::close`] to release it.
    pub async fn consume(&self, shutdown: CancellationToken) -> Result<ConsumeStats> {
        let channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                Error::Consumer("Consumer has already been consumed or closed".to_string())
            })?;

        self.state.send_replace(ConsumerState::Running);
        info!("Consumer started");

        let event_loop = EventLoop {
            transport: Arc::clone(&self.transport),
            resolver: Arc::clone(&self.resolver),
            callbacks: self.callbacks.clone(),
            return_errors: self.config.return_errors,
            return_notifications: self.config.return_notifications,
        };
        let stats = event_loop.run(channels, shutdown, &self.state).await;

        self.state.send_if_modified(|s| {
            if *s == ConsumerState::Closed {
                false
            } else {
                *s = ConsumerState::Terminated;
                true
            }
        });
        info!(
            received = stats.received,
            decoded = stats.decoded,
            failed = stats.failed,
            "Consumer stopped"
        );

        Ok(stats)
    }

    /// Release the transport. Calling it again is a no-op.
    ///
    /// Closing while [`Consumer::consume`] is running ends its record stream,
    /// which makes the event loop return. Records still buffered are dropped
    /// unacknowledged. The transport may block while it commits offsets.
    pub fn close(&self) -> Result<()> {
        let previous = self.state.send_replace(ConsumerState::Closed);
        if previous == ConsumerState::Closed {
            return Ok(());
        }

        // Channels never handed to the event loop.
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        info!("Closing consumer");
        self.transport.close()
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }
}
