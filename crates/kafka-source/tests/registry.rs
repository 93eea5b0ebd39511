//! Schema registry client against a mock registry.

mod common;

use avro_consumer_kafka_source::{
    decode_record, CachedSchemaRegistryClient, Error, ErrorKind, RawRecord, SchemaResolver,
};
use common::{frame, record_x_body, RECORD_X_SCHEMA};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCEPT: &str = "application/vnd.schemaregistry.v1+json";

fn client(urls: &[String]) -> CachedSchemaRegistryClient {
    CachedSchemaRegistryClient::new(urls, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_schema_is_fetched_once_and_cached() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schemas/ids/7"))
        .and(header("accept", ACCEPT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "schema": RECORD_X_SCHEMA })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = client(&[server.uri()]);
    let raw = RawRecord::new("t", 0, 0, frame(7, &record_x_body(1)));

    let first = decode_record(&raw, &registry).await?;
    let second = decode_record(&raw, &registry).await?;

    assert_eq!(first.value, r#"{"x":1}"#);
    assert_eq!(first, second);
    assert_eq!(registry.cached_schemas().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_unknown_id_maps_to_schema_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schemas/ids/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": 40403,
            "message": "Schema 99 not found"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let registry = client(&[server.uri()]);

    // Failures are not cached.
    for _ in 0..2 {
        let err = registry.resolve(99).await.unwrap_err();
        assert!(matches!(err, Error::SchemaNotFound(99)));
    }
    assert_eq!(registry.cached_schemas().await, 0);
}

#[tokio::test]
async fn test_server_error_does_not_fail_over() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "schema": RECORD_X_SCHEMA })),
        )
        .expect(0)
        .mount(&secondary)
        .await;

    let registry = client(&[primary.uri(), secondary.uri()]);
    let err = registry.resolve(7).await.unwrap_err();

    assert!(matches!(err, Error::Registry(_)));
    assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[tokio::test]
async fn test_unreachable_url_fails_over_to_next() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schemas/ids/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "schema": RECORD_X_SCHEMA })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = client(&["http://127.0.0.1:1".to_string(), server.uri()]);
    let codec = registry.resolve(7).await?;

    let expected = apache_avro::Schema::parse_str(RECORD_X_SCHEMA)?;
    assert_eq!(codec.schema().canonical_form(), expected.canonical_form());
    Ok(())
}

#[tokio::test]
async fn test_non_avro_schema_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schemas/ids/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schemaType": "PROTOBUF",
            "schema": "syntax = \"proto3\"; message M {}"
        })))
        .mount(&server)
        .await;

    let registry = client(&[server.uri()]);
    let err = registry.resolve(3).await.unwrap_err();

    assert!(matches!(err, Error::InvalidSchema(_)));
}

#[tokio::test]
async fn test_subject_lookups() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["orders-value", "users-value"])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subjects/orders-value/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subjects/orders-value/versions/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subject": "orders-value",
            "id": 7,
            "version": 3,
            "schema": RECORD_X_SCHEMA
        })))
        .mount(&server)
        .await;

    let registry = client(&[format!("{}/", server.uri())]);

    assert_eq!(registry.subjects().await?, vec!["orders-value", "users-value"]);
    assert_eq!(registry.versions("orders-value").await?, vec![1, 2, 3]);

    let latest = registry.latest_schema("orders-value").await?;
    assert_eq!(latest.id, 7);
    assert_eq!(latest.version, 3);
    assert_eq!(latest.schema, RECORD_X_SCHEMA);

    let missing = registry.versions("nope-value").await.unwrap_err();
    assert!(matches!(missing, Error::Registry(_)));
    Ok(())
}
