//! Avro codec for a single writer schema.
//!
//! A codec converts the Avro binary body of a record into Avro's in-memory
//! [`Value`] (the native form) and renders that value as Avro JSON (the
//! textual form).

use crate::error::{Error, Result};
use apache_avro::types::Value;
use apache_avro::Schema;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;

/// Decoder for one registry schema.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema: Schema,
    /// Named types by full name, used to follow `Schema::Ref`
    named: HashMap<String, Schema>,
}

impl AvroCodec {
    /// Create a codec from a parsed schema.
    pub fn new(schema: Schema) -> Self {
        let mut named = HashMap::new();
        collect_named(&schema, &mut named);
        Self { schema, named }
    }

    /// Parse an Avro schema definition (JSON) into a codec.
    pub fn parse_str(schema_json: &str) -> Result<Self> {
        let schema =
            Schema::parse_str(schema_json).map_err(|e| Error::InvalidSchema(e.to_string()))?;
        Ok(Self::new(schema))
    }

    /// Get a reference to the writer schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decode an Avro binary body into its native form.
    ///
    /// Bytes left over after one datum are ignored. A body that ends early
    /// is an error even where the Avro reader substitutes a null.
    pub fn native_from_binary(&self, data: &[u8]) -> Result<Value> {
        let mut reader = data;
        let value = apache_avro::from_avro_datum(&self.schema, &mut reader, None)
            .map_err(|e| Error::AvroDecode(e.to_string()))?;

        if !value.validate(&self.schema) {
            return Err(Error::AvroDecode(
                "Decoded value does not match the writer schema".to_string(),
            ));
        }
        Ok(value)
    }

    /// Render a native value as Avro JSON.
    pub fn textual_from_native(&self, value: &Value) -> Result<Vec<u8>> {
        let json = self.to_json(value, &self.schema)?;
        serde_json::to_vec(&json).map_err(|e| Error::TextualEncode(e.to_string()))
    }

    fn lookup<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema> {
        match schema {
            Schema::Ref { name } => {
                let fullname = name.fullname(None);
                self.named
                    .get(&fullname)
                    .ok_or_else(|| Error::TextualEncode(format!("Unknown named type: {fullname}")))
            }
            other => Ok(other),
        }
    }

    fn to_json(&self, value: &Value, schema: &Schema) -> Result<JsonValue> {
        let schema = self.lookup(schema)?;

        let json = match value {
            Value::Null => match schema {
                Schema::Null => JsonValue::Null,
                _ => return Err(mismatch("null")),
            },
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => JsonValue::from(*i),
            Value::Long(l)
            | Value::TimeMicros(l)
            | Value::TimestampMillis(l)
            | Value::TimestampMicros(l)
            | Value::TimestampNanos(l)
            | Value::LocalTimestampMillis(l)
            | Value::LocalTimestampMicros(l)
            | Value::LocalTimestampNanos(l) => JsonValue::from(*l),
            // widening the f32 directly would print its binary expansion
            Value::Float(f) => {
                let shortest = f
                    .to_string()
                    .parse::<f64>()
                    .map_err(|e| Error::TextualEncode(e.to_string()))?;
                finite_number(shortest)?
            }
            Value::Double(d) => finite_number(*d)?,
            Value::Bytes(b) | Value::Fixed(_, b) => JsonValue::String(bytes_to_text(b)),
            Value::String(s) | Value::Enum(_, s) => JsonValue::String(s.clone()),
            Value::Uuid(u) => JsonValue::String(u.to_string()),
            Value::Decimal(d) => {
                let bytes = Vec::<u8>::try_from(d)
                    .map_err(|e| Error::TextualEncode(e.to_string()))?;
                JsonValue::String(bytes_to_text(&bytes))
            }
            Value::BigDecimal(d) => JsonValue::String(d.to_string()),
            Value::Duration(d) => {
                let bytes: [u8; 12] = (*d).into();
                JsonValue::String(bytes_to_text(&bytes))
            }
            Value::Union(index, inner) => self.union_to_json(*index, inner, schema)?,
            Value::Array(items) => {
                let Schema::Array(array) = schema else {
                    return Err(mismatch("array"));
                };
                let items = items
                    .iter()
                    .map(|item| self.to_json(item, &array.items))
                    .collect::<Result<Vec<_>>>()?;
                JsonValue::Array(items)
            }
            Value::Map(entries) => {
                let Schema::Map(map) = schema else {
                    return Err(mismatch("map"));
                };
                // HashMap order is random; sort so equal values render identically
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                let mut object = Map::with_capacity(keys.len());
                for key in keys {
                    object.insert(key.clone(), self.to_json(&entries[key], &map.types)?);
                }
                JsonValue::Object(object)
            }
            Value::Record(fields) => {
                let Schema::Record(record) = schema else {
                    return Err(mismatch("record"));
                };
                let mut object = Map::with_capacity(fields.len());
                for ((name, field_value), field) in fields.iter().zip(record.fields.iter()) {
                    object.insert(name.clone(), self.to_json(field_value, &field.schema)?);
                }
                JsonValue::Object(object)
            }
        };

        Ok(json)
    }

    /// Avro JSON wraps non-null union values in a single-key object naming the branch.
    fn union_to_json(&self, index: u32, inner: &Value, schema: &Schema) -> Result<JsonValue> {
        if matches!(inner, Value::Null) {
            return Ok(JsonValue::Null);
        }

        let Schema::Union(union) = schema else {
            return Err(mismatch("union"));
        };
        let branch = union.variants().get(index as usize).ok_or_else(|| {
            Error::TextualEncode(format!(
                "Union branch {index} out of range ({} variants)",
                union.variants().len()
            ))
        })?;

        let mut object = Map::with_capacity(1);
        object.insert(branch_name(branch), self.to_json(inner, branch)?);
        Ok(JsonValue::Object(object))
    }
}

fn collect_named(schema: &Schema, named: &mut HashMap<String, Schema>) {
    match schema {
        Schema::Record(record) => {
            named.insert(record.name.fullname(None), schema.clone());
            for field in &record.fields {
                collect_named(&field.schema, named);
            }
        }
        Schema::Enum(e) => {
            named.insert(e.name.fullname(None), schema.clone());
        }
        Schema::Fixed(f) => {
            named.insert(f.name.fullname(None), schema.clone());
        }
        Schema::Array(array) => collect_named(&array.items, named),
        Schema::Map(map) => collect_named(&map.types, named),
        Schema::Union(union) => {
            for variant in union.variants() {
                collect_named(variant, named);
            }
        }
        _ => {}
    }
}

/// Type name used as the key of a union branch in Avro JSON.
fn branch_name(schema: &Schema) -> String {
    let name = match schema {
        Schema::Null => "null",
        Schema::Boolean => "boolean",
        Schema::Int | Schema::Date | Schema::TimeMillis => "int",
        Schema::Long
        | Schema::TimeMicros
        | Schema::TimestampMillis
        | Schema::TimestampMicros
        | Schema::TimestampNanos
        | Schema::LocalTimestampMillis
        | Schema::LocalTimestampMicros
        | Schema::LocalTimestampNanos => "long",
        Schema::Float => "float",
        Schema::Double => "double",
        Schema::String | Schema::Uuid => "string",
        Schema::Array(_) => "array",
        Schema::Map(_) => "map",
        Schema::Record(record) => return record.name.fullname(None),
        Schema::Enum(e) => return e.name.fullname(None),
        Schema::Fixed(f) => return f.name.fullname(None),
        Schema::Ref { name } => return name.fullname(None),
        Schema::Decimal(decimal) => return branch_name(&decimal.inner),
        Schema::Duration { .. } => "fixed",
        Schema::Bytes | Schema::BigDecimal { .. } => "bytes",
        _ => "bytes",
    };
    name.to_string()
}

/// Avro JSON renders bytes as a string with one code point per byte.
fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn finite_number(value: f64) -> Result<JsonValue> {
    Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| Error::TextualEncode(format!("Cannot represent {value} in JSON")))
}

fn mismatch(kind: &str) -> Error {
    Error::TextualEncode(format!("{kind} value does not match its schema"))
}
