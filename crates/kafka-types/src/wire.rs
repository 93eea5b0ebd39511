//! Registry wire format.
//!
//! Every value written through a schema registry serializer is framed as:
//!
//! ```text
//! +-------+-------------------------+------------------------+
//! | magic | schema id (u32, BE)     | schema-encoded body    |
//! | 1 B   | 4 B                     | remaining bytes        |
//! +-------+-------------------------+------------------------+
//! ```
//!
//! The magic byte is returned to the caller but not validated here.

use crate::error::{Result, WireFormatError};

/// Magic byte written by registry-aware serializers.
pub const MAGIC_BYTE: u8 = 0;

/// Length of the frame header (magic byte + schema id).
pub const HEADER_LEN: usize = 5;

/// A payload split into its frame header and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePayload<'a> {
    /// Format marker at offset 0
    pub magic: u8,
    /// Writer schema identifier at offsets 1..5
    pub schema_id: u32,
    /// Schema-encoded body starting at offset 5
    pub body: &'a [u8],
}

/// Split a framed payload into magic byte, schema id and body.
///
/// Fails only when the payload is shorter than [`HEADER_LEN`].
pub fn split_payload(payload: &[u8]) -> Result<WirePayload<'_>> {
    if payload.len() < HEADER_LEN {
        return Err(WireFormatError::TooShort {
            required: HEADER_LEN,
            actual: payload.len(),
        });
    }

    let (header, body) = payload.split_at(HEADER_LEN);
    let schema_id = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);

    Ok(WirePayload {
        magic: header[0],
        schema_id,
        body,
    })
}
