//! Kafka message types.
//!
//! [`RawRecord`] is what a transport hands to the consumer: an owned copy of
//! one Kafka message. [`DecodedMessage`] is what applications receive after
//! the payload has been resolved against the schema registry and rendered as
//! text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// A Kafka record as delivered by a transport.
///
/// Owned by the transport until it is handed to the consumer, which reads it
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Registry-framed payload (see [`crate::wire`])
    pub payload: Vec<u8>,
    /// Message headers in the order the broker returned them.
    ///
    /// Empty when the broker or protocol version supplies none.
    pub headers: Vec<(String, Vec<u8>)>,
    /// Produce or log-append timestamp, when the broker supplies one
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawRecord {
    /// Create a record with no key, headers or timestamp.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload,
            headers: Vec::new(),
            timestamp: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A decoded Kafka message with metadata.
///
/// Constructed once per successful decode and handed to the data callback;
/// nothing inside the consumer keeps a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    /// Writer schema identifier taken from the payload frame
    pub schema_id: u32,
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Message key bytes read as UTF-8 (empty when the record had no key)
    pub key: String,
    /// Textual (Avro JSON) form of the decoded payload
    pub value: String,
    /// Headers as strings; `None` unless the record carried at least one header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Record timestamp, when the broker supplies one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DecodedMessage {
    /// Build a message from the record metadata and an already rendered value.
    ///
    /// Key and header bytes are read as UTF-8, replacing invalid sequences.
    /// When a header key repeats, the last value wins.
    pub fn from_record(raw: &RawRecord, schema_id: u32, value: String) -> Self {
        let key = raw
            .key
            .as_deref()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .unwrap_or_default();

        let headers = if raw.headers.is_empty() {
            None
        } else {
            Some(
                raw.headers
                    .iter()
                    .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
                    .collect(),
            )
        };

        Self {
            schema_id,
            topic: raw.topic.clone(),
            partition: raw.partition,
            offset: raw.offset,
            key,
            value,
            headers,
            timestamp: raw.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_record_copies_metadata() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let raw = RawRecord::new("orders", 3, 42, vec![0, 0, 0, 0, 1])
            .with_key("order-1")
            .with_timestamp(ts);

        let msg = DecodedMessage::from_record(&raw, 1, r#"{"id":1}"#.to_string());

        assert_eq!(msg.schema_id, 1);
        assert_eq!(msg.topic, "orders");
        assert_eq!(msg.partition, 3);
        assert_eq!(msg.offset, 42);
        assert_eq!(msg.key, "order-1");
        assert_eq!(msg.value, r#"{"id":1}"#);
        assert_eq!(msg.timestamp, Some(ts));
        assert!(msg.headers.is_none());
    }

    #[test]
    fn test_missing_key_becomes_empty_string() {
        let raw = RawRecord::new("t", 0, 0, vec![]);
        let msg = DecodedMessage::from_record(&raw, 9, "null".to_string());

        assert_eq!(msg.key, "");
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_headers_copied_as_strings_last_wins() {
        let raw = RawRecord::new("t", 0, 0, vec![])
            .with_header("trace", b"abc".to_vec())
            .with_header("source", b"billing".to_vec())
            .with_header("trace", b"def".to_vec());

        let msg = DecodedMessage::from_record(&raw, 1, "{}".to_string());
        let headers = msg.headers.unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["trace"], "def");
        assert_eq!(headers["source"], "billing");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let raw = RawRecord::new("t", 0, 0, vec![]).with_key(vec![0x66, 0xFF, 0x6F]);
        let msg = DecodedMessage::from_record(&raw, 1, "{}".to_string());

        assert_eq!(msg.key, "f\u{FFFD}o");
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let raw = RawRecord::new("t", 1, 2, vec![]);
        let msg = DecodedMessage::from_record(&raw, 7, r#"{"x":1}"#.to_string());
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["schema_id"], 7);
        assert_eq!(json["value"], r#"{"x":1}"#);
        assert!(json.get("headers").is_none());
        assert!(json.get("timestamp").is_none());
    }
}
