// ABOUTME: Streaming BONJSON encoder: caller-driven value pushes, canonical bytes out.
// ABOUTME: Mirrors the decoder's container bookkeeping on the same fixed stack layout.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::decoder::{Decoder, EventSink};
use crate::error::{Error, Result};
use crate::num::{self, ReducedNumber};
use crate::types::{
    leb128_encode, limits, signed_byte_width, type_code, unsigned_byte_width, zigzag_encode,
    BigNumber,
};
use crate::utf8::Utf8Validator;
use std::io::Write;

/// Tracks one in-progress container.
#[derive(Clone, Copy)]
struct Frame {
    is_object: bool,
    expecting_key: bool,
    /// Open containers may exceed their declared count and end with an
    /// explicit end byte.
    open: bool,
    remaining: u64,
}

impl Frame {
    const EMPTY: Frame = Frame {
        is_object: false,
        expecting_key: false,
        open: false,
        remaining: 0,
    };
}

/// A BONJSON encoder that writes to a [`Write`] sink.
///
/// The encoder enforces the same structural and canonical-form rules the
/// decoder checks, so its output always decodes. After the first error the
/// context is poisoned: every further call fails with
/// [`Error::MisuseAfterError`].
///
/// # Performance Note
///
/// The encoder writes small chunks (often single bytes) directly to the
/// writer. For file or network I/O, wrap your writer in
/// [`std::io::BufWriter`] to avoid excessive syscall overhead. For in-memory
/// writers like `Vec<u8>`, no buffering is needed.
pub struct Encoder<W: Write> {
    writer: W,
    frames: [Frame; limits::MAX_DEPTH],
    depth: usize,
    root_done: bool,
    terminated: bool,
    /// Mid chunked string: only further chunks are legal.
    in_string: bool,
    utf8: Utf8Validator,
    poisoned: bool,
}

impl<W: Write> Encoder<W> {
    /// Create a new encoder that writes to the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames: [Frame::EMPTY; limits::MAX_DEPTH],
            depth: 0,
            root_done: false,
            terminated: false,
            in_string: false,
            utf8: Utf8Validator::new(),
            poisoned: false,
        }
    }

    /// Consume the encoder and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Encode a null value.
    pub fn add_null(&mut self) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            enc.write_byte(type_code::NULL)?;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode a boolean value.
    pub fn add_bool(&mut self, value: bool) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            enc.write_byte(if value {
                type_code::TRUE
            } else {
                type_code::FALSE
            })?;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode a signed integer in its canonical (shortest) form.
    pub fn add_signed(&mut self, value: i64) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            enc.write_integer(value)?;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode an unsigned integer in its canonical (shortest) form.
    pub fn add_unsigned(&mut self, value: u64) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            enc.write_unsigned(value)?;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode a 64-bit float.
    ///
    /// NaN and infinities are rejected with [`Error::InvalidFloat`]. A float
    /// carrying an exact integer value is rerouted through the integer
    /// encoding; the wire output is identical to the integer path.
    pub fn add_float(&mut self, value: f64) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            if value.is_nan() || value.is_infinite() {
                return Err(Error::InvalidFloat);
            }
            match num::reduce_float(value) {
                ReducedNumber::Signed(v) => enc.write_integer(v)?,
                ReducedNumber::Unsigned(v) => enc.write_unsigned(v)?,
                _ => enc.write_float(value)?,
            }
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode a `BigNumber`.
    ///
    /// The value is reduced first: it lands on the wire as an integer or a
    /// float when it fits one exactly, as a normalized big number otherwise.
    pub fn add_big_number(&mut self, value: BigNumber) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            match num::reduce_big_number(value) {
                ReducedNumber::Signed(v) => enc.write_integer(v)?,
                ReducedNumber::Unsigned(v) => enc.write_unsigned(v)?,
                ReducedNumber::Float(v) => enc.write_float(v)?,
                ReducedNumber::Big(v) => enc.write_big_number_payload(v)?,
            }
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode a whole string.
    pub fn add_string(&mut self, value: &str) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(true)?;
            let bytes = value.as_bytes();
            enc.write_byte(type_code::STRING)?;
            enc.write_varint(bytes.len() as u64)?;
            enc.write_bytes(bytes)?;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Encode one chunk of a string.
    ///
    /// The first chunk opens the value; only the chunk with `is_last` set
    /// completes it and counts toward the enclosing container. Chunks may
    /// split multi-byte code points, but the assembled string must be valid
    /// UTF-8. Empty non-final chunks are dropped (the wire cannot express
    /// them).
    pub fn chunk_string(&mut self, chunk: &[u8], is_last: bool) -> Result<()> {
        self.checked(|enc| {
            if !enc.in_string {
                enc.begin_value(true)?;
                enc.write_byte(type_code::STRING_CHUNKED)?;
                enc.utf8.reset();
                enc.in_string = true;
            }
            if chunk.is_empty() && !is_last {
                return Ok(());
            }
            enc.utf8.feed(chunk)?;
            if is_last {
                enc.utf8.finish()?;
            }
            let header = ((chunk.len() as u64) << 1) | u64::from(!is_last);
            enc.write_varint(header)?;
            enc.write_bytes(chunk)?;
            if is_last {
                enc.in_string = false;
                enc.note_value_end();
            }
            Ok(())
        })
    }

    /// Begin an array declaring `count` elements. With `more_chunks` set the
    /// count is only a minimum and the array stays open until
    /// [`end_container`](Self::end_container) writes its end byte.
    pub fn begin_array(&mut self, count: u64, more_chunks: bool) -> Result<()> {
        self.begin_container(false, count, more_chunks)
    }

    /// Begin an object declaring `count` key-value pairs. With `more_chunks`
    /// set the count is only a minimum, as for arrays.
    pub fn begin_object(&mut self, count: u64, more_chunks: bool) -> Result<()> {
        self.begin_container(true, count, more_chunks)
    }

    fn begin_container(&mut self, is_object: bool, count: u64, open: bool) -> Result<()> {
        self.checked(|enc| {
            enc.begin_value(false)?;
            if enc.depth >= limits::MAX_DEPTH {
                return Err(Error::MaxDepthExceeded);
            }
            if count > u64::MAX >> 1 {
                return Err(Error::ValueOutOfRange);
            }
            enc.write_byte(if is_object {
                type_code::OBJECT
            } else {
                type_code::ARRAY
            })?;
            enc.write_varint(count << 1 | u64::from(open))?;
            enc.frames[enc.depth] = Frame {
                is_object,
                expecting_key: is_object,
                open,
                remaining: count,
            };
            enc.depth += 1;
            Ok(())
        })
    }

    /// Close the innermost container.
    ///
    /// Counted containers must have received exactly their declared count
    /// (the close writes nothing); open containers must have received at
    /// least the declared minimum (the close writes the end byte).
    pub fn end_container(&mut self) -> Result<()> {
        self.checked(|enc| {
            if enc.in_string {
                return Err(Error::IncompleteChunkedString);
            }
            if enc.depth == 0 {
                return Err(Error::UnbalancedContainer);
            }
            let frame = enc.frames[enc.depth - 1];
            if frame.is_object && !frame.expecting_key {
                return Err(Error::ExpectedObjectValue);
            }
            if frame.remaining > 0 {
                return Err(Error::TooFewElements);
            }
            if frame.open {
                enc.write_byte(type_code::CONTAINER_END)?;
            }
            enc.depth -= 1;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Splice in a pre-encoded BONJSON value verbatim.
    ///
    /// The bytes are validated by a full decoder pass and must hold exactly
    /// one complete value with no terminator and no trailing bytes.
    pub fn add_encoded(&mut self, bytes: &[u8]) -> Result<()> {
        self.checked(|enc| {
            let is_string = matches!(
                bytes.first(),
                Some(&type_code::STRING | &type_code::STRING_CHUNKED)
            );
            enc.begin_value(is_string)?;
            let mut probe = Decoder::fragment(bytes);
            let consumed = probe.decode(&mut DiscardSink)?;
            if consumed != bytes.len() {
                return Err(Error::TrailingBytes);
            }
            enc.write_bytes(bytes)?;
            enc.note_value_end();
            Ok(())
        })
    }

    /// Write the document terminator byte. Legal once, after the root value.
    pub fn terminate(&mut self) -> Result<()> {
        self.checked(|enc| {
            if enc.depth > 0 {
                return Err(Error::UnclosedContainer);
            }
            if !enc.root_done {
                return Err(Error::IncompleteDocument);
            }
            if enc.terminated {
                return Err(Error::Custom("document already terminated".into()));
            }
            enc.write_byte(type_code::DOCUMENT_TERMINATOR)?;
            enc.terminated = true;
            Ok(())
        })
    }

    /// Finish encoding: succeeds only when the container stack is empty and
    /// the root value has been written. Returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        if self.poisoned {
            return Err(Error::MisuseAfterError);
        }
        if self.in_string {
            return Err(Error::IncompleteChunkedString);
        }
        if self.depth > 0 {
            return Err(Error::UnclosedContainer);
        }
        if !self.root_done {
            return Err(Error::IncompleteDocument);
        }
        Ok(self.writer)
    }

    // -------------------------------------------------------------------------
    // Internal state tracking
    // -------------------------------------------------------------------------

    /// Run one operation with poison bookkeeping: a poisoned context refuses,
    /// and any failure poisons it.
    fn checked<F: FnOnce(&mut Self) -> Result<()>>(&mut self, op: F) -> Result<()> {
        if self.poisoned {
            return Err(Error::MisuseAfterError);
        }
        let result = op(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Check that a value may start here.
    fn begin_value(&mut self, is_string: bool) -> Result<()> {
        if self.in_string {
            return Err(Error::IncompleteChunkedString);
        }
        if self.depth == 0 {
            if self.root_done {
                return Err(Error::TooManyElements);
            }
            return Ok(());
        }
        let frame = &self.frames[self.depth - 1];
        if frame.is_object && frame.expecting_key {
            if !is_string {
                return Err(Error::KeyMustBeString);
            }
            // A new pair may not start past the declared count.
            if !frame.open && frame.remaining == 0 {
                return Err(Error::TooManyElements);
            }
        } else if !frame.is_object && !frame.open && frame.remaining == 0 {
            return Err(Error::TooManyElements);
        }
        Ok(())
    }

    /// Account for one completed value in the innermost container.
    fn note_value_end(&mut self) {
        if self.depth == 0 {
            self.root_done = true;
            return;
        }
        let frame = &mut self.frames[self.depth - 1];
        if frame.is_object {
            if frame.expecting_key {
                frame.expecting_key = false;
            } else {
                frame.expecting_key = true;
                frame.remaining = frame.remaining.saturating_sub(1);
            }
        } else {
            frame.remaining = frame.remaining.saturating_sub(1);
        }
    }

    // -------------------------------------------------------------------------
    // Internal encoding methods
    // -------------------------------------------------------------------------

    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.writer.write_all(&[byte])?;
        Ok(())
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    #[inline]
    fn write_varint(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 10];
        let n = leb128_encode(value, &mut buf);
        self.write_bytes(&buf[..n])
    }

    /// Write a signed integer in the unique shortest form.
    fn write_integer(&mut self, value: i64) -> Result<()> {
        if (-type_code::SMALLINT_BIAS..=type_code::SMALLINT_BIAS).contains(&value) {
            return self.write_byte(type_code::small_int_code(value));
        }
        if value > 0 {
            return self.write_unsigned(value as u64);
        }
        let width = signed_byte_width(value);
        self.write_byte(type_code::SINT_BASE + width as u8)?;
        self.write_bytes(&value.to_le_bytes()[..width])
    }

    /// Write an unsigned integer in the unique shortest form.
    fn write_unsigned(&mut self, value: u64) -> Result<()> {
        if value <= type_code::SMALLINT_BIAS as u64 {
            return self.write_byte(type_code::small_int_code(value as i64));
        }
        let width = unsigned_byte_width(value);
        self.write_byte(type_code::UINT_BASE + width as u8)?;
        self.write_bytes(&value.to_le_bytes()[..width])
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        let mut buf = [0u8; 9];
        buf[0] = type_code::FLOAT64;
        buf[1..9].copy_from_slice(&value.to_le_bytes());
        self.write_bytes(&buf)
    }

    /// Write a big number payload (type code + signed_length + magnitude + exponent).
    /// The value is already reduced: non-zero, minimal magnitude.
    fn write_big_number_payload(&mut self, value: BigNumber) -> Result<()> {
        self.write_byte(type_code::BIG_NUMBER)?;

        let sig_bytes = value.significand.to_le_bytes();
        let byte_count = 8 - sig_bytes.iter().rev().take_while(|&&b| b == 0).count();

        let signed_length: i64 = if value.sign < 0 {
            -(byte_count as i64)
        } else {
            byte_count as i64
        };
        self.write_varint(zigzag_encode(signed_length))?;
        self.write_bytes(&sig_bytes[..byte_count])?;
        self.write_varint(zigzag_encode(i64::from(value.exponent)))
    }
}

/// Sink that ignores everything; used to validate spliced fragments.
struct DiscardSink;

impl EventSink for DiscardSink {
    fn on_null(&mut self) -> Result<()> {
        Ok(())
    }
    fn on_bool(&mut self, _value: bool) -> Result<()> {
        Ok(())
    }
    fn on_signed(&mut self, _value: i64) -> Result<()> {
        Ok(())
    }
    fn on_unsigned(&mut self, _value: u64) -> Result<()> {
        Ok(())
    }
    fn on_float(&mut self, _value: f64) -> Result<()> {
        Ok(())
    }
    fn on_big_number(&mut self, _value: BigNumber) -> Result<()> {
        Ok(())
    }
    fn on_string(&mut self, _chunk: &[u8], _is_last: bool) -> Result<()> {
        Ok(())
    }
    fn on_begin_array(&mut self, _count_hint: u64) -> Result<()> {
        Ok(())
    }
    fn on_begin_object(&mut self, _count_hint: u64) -> Result<()> {
        Ok(())
    }
    fn on_end_container(&mut self) -> Result<()> {
        Ok(())
    }
    fn on_end_data(&mut self) -> Result<()> {
        Ok(())
    }
}
