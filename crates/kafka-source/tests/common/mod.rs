//! Shared helpers for the consumer integration tests.

#![allow(dead_code)]

use apache_avro::types::Value;
use apache_avro::Schema;
use async_trait::async_trait;
use avro_consumer_kafka_source::{AvroCodec, Result, SchemaResolver, StaticSchemaResolver};
use kafka_types::MAGIC_BYTE;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const RECORD_X_SCHEMA: &str =
    r#"{"type":"record","name":"X","fields":[{"name":"x","type":"int"}]}"#;

pub const RECORD_S_SCHEMA: &str =
    r#"{"type":"record","name":"S","fields":[{"name":"s","type":"string"}]}"#;

/// Frame an Avro body with the registry header for `schema_id`.
pub fn frame(schema_id: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![MAGIC_BYTE];
    payload.extend_from_slice(&schema_id.to_be_bytes());
    payload.extend_from_slice(body);
    payload
}

/// Avro binary body of `{"x": x}` under [`RECORD_X_SCHEMA`].
pub fn record_x_body(x: i32) -> Vec<u8> {
    let schema = Schema::parse_str(RECORD_X_SCHEMA).unwrap();
    let value = Value::Record(vec![("x".to_string(), Value::Int(x))]);
    apache_avro::to_avro_datum(&schema, value).unwrap()
}

/// Resolver that knows [`RECORD_X_SCHEMA`] as id 7 and [`RECORD_S_SCHEMA`]
/// as id 8, and counts lookups.
pub struct CountingResolver {
    inner: StaticSchemaResolver,
    calls: AtomicUsize,
}

impl CountingResolver {
    pub fn new() -> Arc<Self> {
        let inner = StaticSchemaResolver::new()
            .with_schema(7, RECORD_X_SCHEMA)
            .unwrap()
            .with_schema(8, RECORD_S_SCHEMA)
            .unwrap();
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaResolver for CountingResolver {
    async fn resolve(&self, schema_id: u32) -> Result<Arc<AvroCodec>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(schema_id).await
    }
}

/// Poll `condition` until it holds or a second has passed.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
