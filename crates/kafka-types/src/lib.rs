//! Shared types for consuming schema-registry encoded Kafka records.
//!
//! This crate holds the data model that flows between the transport, the
//! record decoder and application callbacks. It has no Kafka or Avro
//! dependency so that applications can name these types without pulling in
//! librdkafka.
//!
//! # Architecture
//!
//! ```text
//! transport → RawRecord → (wire::split_payload → resolver → codec) → DecodedMessage → callback
//!           → Notification ───────────────────────────────────────────────────────→ callback
//! ```
//!
//! # Modules
//!
//! - [`message`] - `RawRecord` as delivered by a transport, `DecodedMessage` as delivered to applications
//! - [`notification`] - consumer-group rebalance notifications
//! - [`wire`] - the registry wire format (magic byte, schema id, body)
//! - [`error`] - wire format errors

pub mod error;
pub mod message;
pub mod notification;
pub mod wire;

// Re-export main types for convenient access
pub use error::{Result, WireFormatError};
pub use message::{DecodedMessage, RawRecord};
pub use notification::{partition_map, Notification, NotificationKind, PartitionMap};
pub use wire::{split_payload, WirePayload, HEADER_LEN, MAGIC_BYTE};
