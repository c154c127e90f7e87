// ABOUTME: Serde Deserializer implementation for BONJSON decoding.
// ABOUTME: Pulls events from the streaming decoder and maps them onto serde's visitor model.

use crate::decoder::{Decoder, Event};
use crate::error::{Error, Result};
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::borrow::Cow;

/// A serde Deserializer that reads BONJSON.
pub struct Deserializer<'de> {
    decoder: Decoder<'de>,
    /// Peeked event for look-ahead
    peeked: Option<Event<'de>>,
}

impl<'de> Deserializer<'de> {
    /// Create a new Deserializer from a byte slice.
    #[must_use]
    pub fn from_slice(data: &'de [u8]) -> Self {
        Self {
            decoder: Decoder::new(data),
            peeked: None,
        }
    }

    /// Get the underlying decoder (consumes self).
    #[must_use]
    pub fn into_decoder(self) -> Decoder<'de> {
        self.decoder
    }

    fn peek(&mut self) -> Result<&Event<'de>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.decoder.next_event()?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    fn next(&mut self) -> Result<Event<'de>> {
        match self.peeked.take() {
            Some(event) => Ok(event),
            None => self.decoder.next_event(),
        }
    }

    /// Read a whole string value, reassembling chunks when needed.
    fn next_string(&mut self) -> Result<Cow<'de, str>> {
        match self.next()? {
            Event::String {
                chunk,
                is_last: true,
            } => Ok(Cow::Borrowed(std::str::from_utf8(chunk)?)),
            Event::String {
                chunk,
                is_last: false,
            } => {
                let mut buf = chunk.to_vec();
                loop {
                    match self.next()? {
                        Event::String { chunk, is_last } => {
                            buf.extend_from_slice(chunk);
                            if is_last {
                                break;
                            }
                        }
                        _ => return Err(Error::Custom("expected string chunk".into())),
                    }
                }
                String::from_utf8(buf)
                    .map(Cow::Owned)
                    .map_err(|_| Error::InvalidUtf8)
            }
            _ => Err(Error::Custom("expected string".into())),
        }
    }

    /// Check that the document is complete with nothing left over.
    fn end(&mut self) -> Result<()> {
        match self.next()? {
            Event::End => {}
            _ => return Err(Error::TrailingBytes),
        }
        if !self.decoder.is_empty() {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }
}

/// Deserialize a value from a BONJSON byte slice.
/// The whole slice must be one document; trailing bytes are an error.
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    let mut de = Deserializer::from_slice(data);
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

fn visit_cow<'de, V: Visitor<'de>>(cow: Cow<'de, str>, visitor: V) -> Result<V::Value> {
    match cow {
        Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
        Cow::Owned(s) => visitor.visit_string(s),
    }
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.peek()? {
            Event::String { .. } => {
                let s = self.next_string()?;
                return visit_cow(s, visitor);
            }
            Event::BeginArray { .. } => {
                self.next()?;
                return visitor.visit_seq(SeqDeserializer::new(self));
            }
            Event::BeginObject { .. } => {
                self.next()?;
                return visitor.visit_map(MapDeserializer::new(self));
            }
            _ => {}
        }
        match self.next()? {
            Event::Null => visitor.visit_unit(),
            Event::Bool(v) => visitor.visit_bool(v),
            Event::Signed(v) => visitor.visit_i64(v),
            Event::Unsigned(v) => visitor.visit_u64(v),
            Event::Float(v) => visitor.visit_f64(v),
            // A canonical big number never fits a native integer, so the
            // closest serde can get is an approximate double.
            Event::BigNumber(bn) => visitor.visit_f64(bn.to_f64()),
            Event::EndContainer => Err(Error::UnbalancedContainer),
            Event::End => Err(Error::Custom("document already complete".into())),
            Event::String { .. } | Event::BeginArray { .. } | Event::BeginObject { .. } => {
                unreachable!("handled via peek")
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::Bool(v) => visitor.visit_bool(v),
            _ => Err(Error::Custom("expected bool".into())),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::Signed(v) => visitor.visit_i64(v),
            Event::Unsigned(v) => visitor.visit_u64(v),
            _ => Err(Error::Custom("expected integer".into())),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::Signed(v) => visitor.visit_i64(v),
            Event::Unsigned(v) => visitor.visit_u64(v),
            _ => Err(Error::Custom("expected unsigned integer".into())),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_f64(visitor)
    }

    #[allow(clippy::cast_precision_loss)]
    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::Float(v) => visitor.visit_f64(v),
            Event::Signed(v) => visitor.visit_f64(v as f64),
            Event::Unsigned(v) => visitor.visit_f64(v as f64),
            Event::BigNumber(bn) => visitor.visit_f64(bn.to_f64()),
            _ => Err(Error::Custom("expected number".into())),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.next_string()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(Error::Custom("expected single character".into())),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.next_string()?;
        visit_cow(s, visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        // Byte strings travel as arrays of integers
        match self.next()? {
            Event::BeginArray { .. } => {
                let mut bytes = Vec::new();
                loop {
                    match self.next()? {
                        Event::EndContainer => break,
                        Event::Signed(n) if (0..=255).contains(&n) => bytes.push(n as u8),
                        _ => return Err(Error::Custom("expected byte array".into())),
                    }
                }
                visitor.visit_bytes(&bytes)
            }
            _ => Err(Error::Custom("expected array of bytes".into())),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if matches!(self.peek()?, Event::Null) {
            self.next()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::Null => visitor.visit_unit(),
            _ => Err(Error::Custom("expected null".into())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::BeginArray { .. } => visitor.visit_seq(SeqDeserializer::new(self)),
            _ => Err(Error::Custom("expected array".into())),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next()? {
            Event::BeginObject { .. } => visitor.visit_map(MapDeserializer::new(self)),
            _ => Err(Error::Custom("expected object".into())),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.peek()? {
            // Unit variant: just a string
            Event::String { .. } => visitor.visit_enum(UnitVariantDeserializer::new(self)),
            // Other variants: object with a single key
            Event::BeginObject { .. } => {
                self.next()?;
                visitor.visit_enum(EnumDeserializer::new(self))
            }
            _ => Err(Error::Custom("expected string or object for enum".into())),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.next_string()?;
        visit_cow(s, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }
}

struct SeqDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> SeqDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        SeqDeserializer { de }
    }
}

impl<'a, 'de> SeqAccess<'de> for SeqDeserializer<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if matches!(self.de.peek()?, Event::EndContainer) {
            self.de.next()?;
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

struct MapDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> MapDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        MapDeserializer { de }
    }
}

impl<'a, 'de> MapAccess<'de> for MapDeserializer<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if matches!(self.de.peek()?, Event::EndContainer) {
            self.de.next()?;
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }
}

struct UnitVariantDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> UnitVariantDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        UnitVariantDeserializer { de }
    }
}

impl<'a, 'de> de::EnumAccess<'de> for UnitVariantDeserializer<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for UnitVariantDeserializer<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }
}

struct EnumDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> EnumDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        EnumDeserializer { de }
    }

    fn expect_container_end(&mut self) -> Result<()> {
        match self.de.next()? {
            Event::EndContainer => Ok(()),
            _ => Err(Error::Custom("expected container end".into())),
        }
    }
}

impl<'a, 'de> de::EnumAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Err(Error::Custom(
            "expected newtype, tuple, or struct variant".into(),
        ))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(mut self, seed: T) -> Result<T::Value> {
        let value = seed.deserialize(&mut *self.de)?;
        self.expect_container_end()?;
        Ok(value)
    }

    fn tuple_variant<V: Visitor<'de>>(mut self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.de.next()? {
            Event::BeginArray { .. } => {
                let value = visitor.visit_seq(SeqDeserializer::new(self.de))?;
                self.expect_container_end()?;
                Ok(value)
            }
            _ => Err(Error::Custom("expected array for tuple variant".into())),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        mut self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.de.next()? {
            Event::BeginObject { .. } => {
                let value = visitor.visit_map(MapDeserializer::new(self.de))?;
                self.expect_container_end()?;
                Ok(value)
            }
            _ => Err(Error::Custom("expected object for struct variant".into())),
        }
    }
}
