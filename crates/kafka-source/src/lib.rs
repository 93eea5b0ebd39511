//! Schema-registry aware Avro consumer for Kafka.
//!
//! This crate provides:
//! - Avro codec rendering registry-framed records as Avro JSON
//! - Cached schema registry client
//! - Kafka and in-memory transports
//! - Consumer with callback delivery, graceful shutdown and ordered offset
//!   acknowledgment
//!
//! # Processing
//!
//! Every record taken from the transport is decoded exactly once and then
//! acknowledged, whether decoding succeeded or not. A record that cannot be
//! decoded is reported to the error callback and skipped.
//!
//! # Dependency Direction
//!
//! This crate depends on `kafka-types` for the shared record, message and
//! notification types.

/// Application callbacks
pub mod callbacks;
pub mod codec;
pub mod config;

/// Consumer lifecycle: connect, consume, close
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod event_loop;
pub mod registry;

/// Log transports feeding the consumer
pub mod transport;

// Re-export from kafka-types for convenience
pub use kafka_types::{DecodedMessage, Notification, NotificationKind, PartitionMap, RawRecord};

pub use callbacks::ConsumerCallbacks;
pub use codec::AvroCodec;
pub use config::{Config, ConsumerConfig, InitialOffset};
pub use consumer::{Consumer, ConsumerState};
pub use decoder::decode_record;
pub use error::{Error, ErrorKind, Result};
pub use event_loop::ConsumeStats;
pub use registry::{CachedSchemaRegistryClient, SchemaResolver, StaticSchemaResolver, SubjectSchema};
pub use transport::{InMemoryTransport, KafkaTransport, Transport, TransportChannels};
