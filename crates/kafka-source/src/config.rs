//! Consumer configuration.

use crate::error::{Error, Result};
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Where a consumer group with no committed position starts reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum InitialOffset {
    /// Start from the earliest retained record
    #[default]
    Oldest,
    /// Start from the end of the partition
    Newest,
    /// Require a committed position; fail otherwise
    Committed,
}

impl InitialOffset {
    /// Value for librdkafka's `auto.offset.reset`.
    pub fn as_auto_offset_reset(self) -> &'static str {
        match self {
            InitialOffset::Oldest => "earliest",
            InitialOffset::Newest => "latest",
            InitialOffset::Committed => "error",
        }
    }
}

/// Library-level consumer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Forward transport errors to the error callback
    pub return_errors: bool,
    /// Forward rebalance notifications to the notification callback
    pub return_notifications: bool,
    pub initial_offset: InitialOffset,
    pub session_timeout_ms: u32,
    /// How often stored offsets are committed to the group coordinator
    pub auto_commit_interval_ms: u32,
    /// Capacity of the record channel between transport and event loop
    pub channel_buffer_size: usize,
    /// Bound on the initial cluster metadata check
    pub connect_timeout: Duration,
    /// Request timeout for a single schema registry lookup
    pub registry_timeout: Duration,
    /// Extra librdkafka settings, applied last
    pub overrides: Vec<(String, String)>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            return_errors: true,
            return_notifications: true,
            initial_offset: InitialOffset::Oldest,
            session_timeout_ms: 30000,
            auto_commit_interval_ms: 1000,
            channel_buffer_size: 256,
            connect_timeout: Duration::from_secs(10),
            registry_timeout: Duration::from_secs(10),
            overrides: Vec::new(),
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "channel_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.session_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "session_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() || self.registry_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// librdkafka settings for a consumer in `group_id`.
    ///
    /// Offsets are stored explicitly on acknowledgment and committed by the
    /// auto-commit timer, so only processed records are ever committed.
    pub fn client_settings(&self, brokers: &[String], group_id: &str) -> Vec<(String, String)> {
        let mut settings = vec![
            ("bootstrap.servers".to_string(), brokers.join(",")),
            ("group.id".to_string(), group_id.to_string()),
            ("enable.auto.commit".to_string(), "true".to_string()),
            ("enable.auto.offset.store".to_string(), "false".to_string()),
            (
                "auto.commit.interval.ms".to_string(),
                self.auto_commit_interval_ms.to_string(),
            ),
            (
                "session.timeout.ms".to_string(),
                self.session_timeout_ms.to_string(),
            ),
            (
                "auto.offset.reset".to_string(),
                self.initial_offset.as_auto_offset_reset().to_string(),
            ),
            ("enable.partition.eof".to_string(), "false".to_string()),
        ];
        settings.extend(self.overrides.iter().cloned());
        settings
    }
}

/// Command-line configuration for the Avro consumer.
#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// Kafka brokers (comma-separated or multiple --brokers)
    #[clap(long, env = "KAFKA_BROKERS", value_delimiter = ',', required = true)]
    pub brokers: Vec<String>,
    /// Schema registry URLs, tried in order when one is unreachable
    #[clap(long, env = "SCHEMA_REGISTRY_URLS", value_delimiter = ',', required = true)]
    pub registry_urls: Vec<String>,
    /// Topic to consume from
    #[clap(long)]
    pub topic: String,
    /// Consumer group ID
    #[clap(long)]
    pub group_id: String,
    /// Start position when the group has no committed offset
    #[clap(long, value_enum, default_value_t = InitialOffset::Oldest)]
    pub initial_offset: InitialOffset,
    /// Do not report transport errors
    #[clap(long)]
    pub no_errors: bool,
    /// Do not report rebalance notifications
    #[clap(long)]
    pub no_notifications: bool,
    /// Session timeout in milliseconds
    #[clap(long, default_value_t = 30000)]
    pub session_timeout_ms: u32,
    /// Offset commit interval in milliseconds
    #[clap(long, default_value_t = 1000)]
    pub auto_commit_interval_ms: u32,
    /// Number of records buffered between Kafka and the decoder
    #[clap(long, default_value_t = 256)]
    pub channel_buffer_size: usize,
    /// Seconds to wait for the initial broker metadata
    #[clap(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for a single schema registry response
    #[clap(long, default_value_t = 10)]
    pub registry_timeout_secs: u64,
    /// Extra librdkafka setting as KEY=VALUE (repeatable)
    #[clap(long = "kafka-option", value_parser = parse_key_value)]
    pub kafka_options: Vec<(String, String)>,
}

impl Config {
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            return_errors: !self.no_errors,
            return_notifications: !self.no_notifications,
            initial_offset: self.initial_offset,
            session_timeout_ms: self.session_timeout_ms,
            auto_commit_interval_ms: self.auto_commit_interval_ms,
            channel_buffer_size: self.channel_buffer_size,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            registry_timeout: Duration::from_secs(self.registry_timeout_secs),
            overrides: self.kafka_options.clone(),
        }
    }
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
