//! Rendering decoded messages for standard output.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use kafka_types::DecodedMessage;
use serde::Serialize;
use std::collections::HashMap;

/// How each decoded message is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line with metadata and the decoded value
    #[default]
    Json,
    /// The decoded value only
    Value,
}

#[derive(Serialize)]
struct Envelope<'a> {
    topic: &'a str,
    partition: i32,
    offset: i64,
    schema_id: u32,
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    value: serde_json::Value,
}

/// Render a message as a single line.
///
/// In [`OutputFormat::Json`] the value is embedded as JSON; a value that is
/// not valid JSON is embedded as a string.
pub fn format_message(message: &DecodedMessage, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Value => Ok(message.value.clone()),
        OutputFormat::Json => {
            let value = serde_json::from_str(&message.value)
                .unwrap_or_else(|_| serde_json::Value::String(message.value.clone()));
            let envelope = Envelope {
                topic: &message.topic,
                partition: message.partition,
                offset: message.offset,
                schema_id: message.schema_id,
                key: &message.key,
                headers: message.headers.as_ref(),
                timestamp: message.timestamp,
                value,
            };
            Ok(serde_json::to_string(&envelope)?)
        }
    }
}
