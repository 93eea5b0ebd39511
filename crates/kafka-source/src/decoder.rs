//! Record decoding: wire frame, schema lookup, Avro binary to Avro JSON.

use crate::error::{Error, Result};
use crate::registry::SchemaResolver;
use kafka_types::{split_payload, DecodedMessage, RawRecord};
use tracing::debug;

/// Decode one raw record into a [`DecodedMessage`].
///
/// The resolver is only consulted once the frame header is known to be
/// complete. Resolver errors are returned unchanged.
pub async fn decode_record(
    raw: &RawRecord,
    resolver: &dyn SchemaResolver,
) -> Result<DecodedMessage> {
    let frame = split_payload(&raw.payload)?;
    let codec = resolver.resolve(frame.schema_id).await?;

    let native = codec.native_from_binary(frame.body)?;
    let textual = codec.textual_from_native(&native)?;
    let value = String::from_utf8(textual)
        .map_err(|e| Error::TextualEncode(format!("Textual form is not UTF-8: {e}")))?;

    debug!(
        topic = %raw.topic,
        partition = raw.partition,
        offset = raw.offset,
        schema_id = frame.schema_id,
        "Decoded record"
    );

    Ok(DecodedMessage::from_record(raw, frame.schema_id, value))
}
