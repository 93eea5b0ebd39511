//! Schema resolution.
//!
//! [`SchemaResolver`] is the seam between the record decoder and whatever
//! knows the writer schemas. [`CachedSchemaRegistryClient`] talks to a
//! Confluent-compatible schema registry over HTTP and keeps every schema it
//! fetched successfully; [`StaticSchemaResolver`] serves a fixed set of
//! schemas from memory.

use crate::codec::AvroCodec;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const REGISTRY_MEDIA_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Maps a schema identifier to a codec.
///
/// Resolving the same identifier twice must yield codecs that decode the
/// same bytes to the same text.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    async fn resolve(&self, schema_id: u32) -> Result<Arc<AvroCodec>>;
}

/// Schema version returned by subject lookups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubjectSchema {
    pub subject: String,
    pub id: u32,
    pub version: u32,
    pub schema: String,
}

#[derive(Debug, Deserialize)]
struct SchemaByIdResponse {
    schema: String,
    #[serde(rename = "schemaType", default)]
    schema_type: Option<String>,
}

/// HTTP client for schema registry lookups with a per-id codec cache.
///
/// Only successful lookups are cached; a failed lookup is attempted again the
/// next time the id is seen.
pub struct CachedSchemaRegistryClient {
    base_urls: Vec<String>,
    http_client: reqwest::Client,
    cache: RwLock<HashMap<u32, Arc<AvroCodec>>>,
}

impl CachedSchemaRegistryClient {
    /// Create a client for one or more registry URLs.
    ///
    /// Requests go to the first URL; the next one is used only when a request
    /// fails before any HTTP response arrives.
    pub fn new(base_urls: &[String], timeout: Duration) -> Result<Self> {
        if base_urls.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one schema registry URL is required".to_string(),
            ));
        }

        let base_urls = base_urls
            .iter()
            .map(|url| {
                reqwest::Url::parse(url).map_err(|e| {
                    Error::Connection(format!("Invalid schema registry URL {url}: {e}"))
                })?;
                Ok(url.trim_end_matches('/').to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_urls,
            http_client,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Get the codec for a schema id, fetching it on first use.
    pub async fn get_schema(&self, schema_id: u32) -> Result<Arc<AvroCodec>> {
        if let Some(codec) = self.cache.read().await.get(&schema_id) {
            return Ok(Arc::clone(codec));
        }

        let response: SchemaByIdResponse = self
            .get_json(&format!("/schemas/ids/{schema_id}"))
            .await?
            .ok_or(Error::SchemaNotFound(schema_id))?;

        if let Some(schema_type) = response.schema_type.as_deref() {
            if !schema_type.eq_ignore_ascii_case("AVRO") {
                return Err(Error::InvalidSchema(format!(
                    "Schema {schema_id} has type {schema_type}, expected AVRO"
                )));
            }
        }

        let codec = AvroCodec::parse_str(&response.schema)
            .map_err(|e| Error::InvalidSchema(format!("Schema {schema_id}: {e}")))?;
        let codec = Arc::new(codec);

        debug!(schema_id, "Schema retrieved and cached");
        self.cache
            .write()
            .await
            .insert(schema_id, Arc::clone(&codec));

        Ok(codec)
    }

    /// List all registered subjects.
    pub async fn subjects(&self) -> Result<Vec<String>> {
        self.get_json("/subjects")
            .await?
            .ok_or_else(|| Error::Registry("Subject listing not available".to_string()))
    }

    /// List the versions registered under a subject.
    pub async fn versions(&self, subject: &str) -> Result<Vec<u32>> {
        self.get_json(&format!("/subjects/{subject}/versions"))
            .await?
            .ok_or_else(|| Error::Registry(format!("Subject not found: {subject}")))
    }

    /// Get the latest schema version of a subject.
    pub async fn latest_schema(&self, subject: &str) -> Result<SubjectSchema> {
        self.get_json(&format!("/subjects/{subject}/versions/latest"))
            .await?
            .ok_or_else(|| Error::Registry(format!("Subject not found: {subject}")))
    }

    /// Number of schemas currently cached.
    pub async fn cached_schemas(&self) -> usize {
        self.cache.read().await.len()
    }

    /// GET a registry path, returning `None` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let mut last_error = None;

        for base_url in &self.base_urls {
            let url = format!("{base_url}{path}");
            let response = match self
                .http_client
                .get(&url)
                .header(ACCEPT, REGISTRY_MEDIA_TYPE)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %url, error = %e, "Schema registry request failed");
                    last_error = Some(e);
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Registry(format!(
                    "GET {path} failed with status {status}: {body}"
                )));
            }

            let parsed = response.json::<T>().await.map_err(|e| {
                Error::Registry(format!("Failed to parse response for {path}: {e}"))
            })?;
            return Ok(Some(parsed));
        }

        Err(Error::Registry(match last_error {
            Some(e) => format!("All schema registry URLs failed for {path}: {e}"),
            None => format!("No schema registry URL available for {path}"),
        }))
    }
}

#[async_trait]
impl SchemaResolver for CachedSchemaRegistryClient {
    async fn resolve(&self, schema_id: u32) -> Result<Arc<AvroCodec>> {
        self.get_schema(schema_id).await
    }
}

/// Resolver over a fixed set of schemas held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaResolver {
    codecs: HashMap<u32, Arc<AvroCodec>>,
}

impl StaticSchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema definition under an id, replacing any previous one.
    pub fn register(&mut self, schema_id: u32, schema_json: &str) -> Result<()> {
        let codec = AvroCodec::parse_str(schema_json)?;
        self.codecs.insert(schema_id, Arc::new(codec));
        Ok(())
    }

    pub fn with_schema(mut self, schema_id: u32, schema_json: &str) -> Result<Self> {
        self.register(schema_id, schema_json)?;
        Ok(self)
    }
}

#[async_trait]
impl SchemaResolver for StaticSchemaResolver {
    async fn resolve(&self, schema_id: u32) -> Result<Arc<AvroCodec>> {
        self.codecs
            .get(&schema_id)
            .cloned()
            .ok_or(Error::SchemaNotFound(schema_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_a_url() {
        let err = CachedSchemaRegistryClient::new(&[], Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_client_rejects_malformed_url() {
        let urls = ["not a url".to_string()];
        let err = CachedSchemaRegistryClient::new(&urls, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = CachedSchemaRegistryClient::new(
            &["http://registry:8081/".to_string()],
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_urls, vec!["http://registry:8081".to_string()]);
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticSchemaResolver::new()
            .with_schema(7, r#""int""#)
            .unwrap();

        assert!(resolver.resolve(7).await.is_ok());
        assert!(matches!(
            resolver.resolve(8).await,
            Err(Error::SchemaNotFound(8))
        ));
    }
}
