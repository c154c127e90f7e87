// ABOUTME: BONJSON (Binary Object Notation for JSON) streaming codec for Rust.
// ABOUTME: Event-driven encoder/decoder core with serde and Value layers on top.

//! # BONJSON
//!
//! A streaming BONJSON (Binary Object Notation for JSON) encoder and decoder.
//!
//! BONJSON is a binary format that is 1:1 compatible with the JSON data
//! model but faster to process and more compact. Every value has exactly one
//! legal byte encoding: the encoder always produces it and the decoder
//! rejects everything else, so equal values always have equal bytes.
//!
//! ## Quick Start
//!
//! ```rust
//! use bonjson_stream::{to_vec, from_slice};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! let person = Person {
//!     name: "Alice".to_string(),
//!     age: 30,
//! };
//!
//! // Serialize to BONJSON
//! let bytes = to_vec(&person).unwrap();
//!
//! // Deserialize from BONJSON
//! let decoded: Person = from_slice(&bytes).unwrap();
//! assert_eq!(person, decoded);
//! ```
//!
//! ## Streaming
//!
//! The core is a pair of state machines. The [`Encoder`] is driven by value
//! pushes and writes to any [`std::io::Write`] sink; the [`Decoder`] walks a
//! byte slice and fires events into an [`EventSink`] (or hands them out one
//! at a time via [`Decoder::next_event`]). Neither buffers payload data, so
//! strings and containers can be produced and consumed in chunks.
//!
//! ```rust
//! use bonjson_stream::Encoder;
//!
//! let mut buf = Vec::new();
//! let mut encoder = Encoder::new(&mut buf);
//! encoder.begin_object(1, false).unwrap();
//! encoder.add_string("greeting").unwrap();
//! encoder.chunk_string(b"hel", false).unwrap();
//! encoder.chunk_string(b"lo", true).unwrap();
//! encoder.end_container().unwrap();
//! encoder.finish().unwrap();
//! ```
//!
//! ## Working with Dynamic Values
//!
//! ```rust
//! use bonjson_stream::{bonjson, encode_value, decode_value};
//!
//! let value = bonjson!({
//!     "name": "test",
//!     "values": [1, 2, 3],
//!     "active": true
//! });
//!
//! let bytes = encode_value(&value).unwrap();
//! assert_eq!(decode_value(&bytes).unwrap(), value);
//! ```
//!
//! ## Resource Limits
//!
//! The container stack is a fixed inline array: nesting is limited to
//! [`limits::MAX_DEPTH`] (256) frames and neither codec allocates on the
//! decode/encode hot path.

pub mod de;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod num;
pub mod ser;
pub mod types;
pub mod utf8;
pub mod value;

// Re-export commonly used items at the crate root
pub use de::{from_slice, Deserializer};
pub use decoder::{decode, Decoder, Event, EventSink};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use ser::Serializer;
pub use types::{limits, type_code, BigNumber};
pub use value::{Value, ValueBuilder};

// The bonjson! macro is automatically exported at crate root via #[macro_export]

use num::ReducedNumber;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Serialize a value to a BONJSON byte vector.
///
/// # Example
///
/// ```rust
/// use bonjson_stream::to_vec;
///
/// let bytes = to_vec(&42i32).unwrap();
/// assert_eq!(bytes, vec![0x8e]); // Small integer 42
/// ```
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    to_writer(&mut buf, value)?;
    Ok(buf)
}

/// Serialize a value to a writer.
///
/// # Example
///
/// ```rust
/// use bonjson_stream::to_writer;
///
/// let mut buf = Vec::new();
/// to_writer(&mut buf, &"hello").unwrap();
/// ```
pub fn to_writer<W: Write, T: Serialize>(writer: W, value: &T) -> Result<()> {
    let mut encoder = Encoder::new(writer);
    {
        let mut serializer = Serializer::new(&mut encoder);
        value.serialize(&mut serializer)?;
    }
    encoder.finish()?;
    Ok(())
}

/// Decode a BONJSON document into a `Value`.
/// The whole slice must be one document; trailing bytes are an error.
///
/// # Example
///
/// ```rust
/// use bonjson_stream::{decode_value, Value};
///
/// let bytes = vec![0xdd, 0x06, 0x65, 0x66, 0x67]; // [1, 2, 3]
/// let value = decode_value(&bytes).unwrap();
/// assert!(value.is_array());
/// ```
pub fn decode_value(data: &[u8]) -> Result<Value> {
    let mut builder = ValueBuilder::new();
    let consumed = Decoder::new(data).decode(&mut builder)?;
    if consumed != data.len() {
        return Err(Error::TrailingBytes);
    }
    builder.into_value()
}

/// Encode a `Value` to BONJSON bytes.
///
/// # Example
///
/// ```rust
/// use bonjson_stream::{encode_value, Value};
///
/// let value = Value::Int(42);
/// let bytes = encode_value(&value).unwrap();
/// assert_eq!(bytes, vec![0x8e]);
/// ```
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to_writer(&mut buf, value)?;
    Ok(buf)
}

/// Encode a `Value` to a writer.
pub fn encode_value_to_writer<W: Write>(writer: W, value: &Value) -> Result<()> {
    let mut encoder = Encoder::new(writer);
    encode_value_recursive(&mut encoder, value)?;
    encoder.finish()?;
    Ok(())
}

fn encode_value_recursive<W: Write>(encoder: &mut Encoder<W>, value: &Value) -> Result<()> {
    match value {
        Value::Null => encoder.add_null(),
        Value::Bool(b) => encoder.add_bool(*b),
        Value::Int(n) => encoder.add_signed(*n),
        Value::UInt(n) => encoder.add_unsigned(*n),
        Value::Float(f) => encoder.add_float(*f),
        Value::BigNumber(bn) => encoder.add_big_number(*bn),
        Value::String(s) => encoder.add_string(s),
        Value::Array(arr) => {
            encoder.begin_array(arr.len() as u64, false)?;
            for item in arr {
                encode_value_recursive(encoder, item)?;
            }
            encoder.end_container()
        }
        Value::Object(map) => {
            encoder.begin_object(map.len() as u64, false)?;
            for (key, val) in map {
                encoder.add_string(key)?;
                encode_value_recursive(encoder, val)?;
            }
            encoder.end_container()
        }
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            // Generic serializers have no big-number type. Reduce first so
            // values that are secretly integers or exact doubles survive;
            // only the rest degrade to an approximate double.
            Value::BigNumber(bn) => match num::reduce_big_number(*bn) {
                ReducedNumber::Signed(n) => serializer.serialize_i64(n),
                ReducedNumber::Unsigned(n) => serializer.serialize_u64(n),
                ReducedNumber::Float(f) => serializer.serialize_f64(f),
                ReducedNumber::Big(bn) => serializer.serialize_f64(bn.to_f64()),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => serializer.collect_seq(arr),
            Value::Object(map) => serializer.collect_map(map),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "any BONJSON-representable value")
            }

            // The numeric From impls collapse u64 into Int whenever it
            // fits, matching how the decoder surfaces integers.
            fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D: serde::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error> {
                Value::deserialize(deserializer)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut arr = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(elem) = seq.next_element()? {
                    arr.push(elem);
                }
                Ok(Value::Array(arr))
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut obj = std::collections::BTreeMap::new();
                while let Some((key, val)) = map.next_entry::<String, Value>()? {
                    obj.insert(key, val);
                }
                Ok(Value::Object(obj))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
