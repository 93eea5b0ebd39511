//! avro-consumer library
//!
//! Output formatting for the `avro-consumer` command. The consumer itself
//! lives in `avro_consumer_kafka_source`; shared types in `kafka_types`.

pub mod output;

pub use output::{format_message, OutputFormat};
