// ABOUTME: Streaming BONJSON decoder: a single left-to-right pass over a byte slice.
// ABOUTME: Emits events to a caller-supplied sink; containers live on a fixed inline stack.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::num::{self, ReducedNumber};
use crate::types::{
    leb128_decode, limits, signed_byte_width, type_code, unpack_signed_le, unpack_unsigned_le,
    unsigned_byte_width, zigzag_decode, BigNumber,
};
use crate::utf8::{validate_utf8, Utf8Validator};

/// Receives decoded values in document order.
///
/// Every method may refuse by returning an error; the decode stops
/// immediately and the error is returned to the caller unchanged.
pub trait EventSink {
    fn on_null(&mut self) -> Result<()>;
    fn on_bool(&mut self, value: bool) -> Result<()>;
    fn on_signed(&mut self, value: i64) -> Result<()>;
    fn on_unsigned(&mut self, value: u64) -> Result<()>;
    fn on_float(&mut self, value: f64) -> Result<()>;
    fn on_big_number(&mut self, value: BigNumber) -> Result<()>;
    /// A string, or one chunk of one. Chunks may split multi-byte code
    /// points; the concatenation up to the final chunk is valid UTF-8.
    fn on_string(&mut self, chunk: &[u8], is_last: bool) -> Result<()>;
    fn on_begin_array(&mut self, count_hint: u64) -> Result<()>;
    fn on_begin_object(&mut self, count_hint: u64) -> Result<()>;
    fn on_end_container(&mut self) -> Result<()>;
    fn on_end_data(&mut self) -> Result<()>;
}

/// One decoded item, as produced by the pull interface [`Decoder::next_event`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    Null,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    BigNumber(BigNumber),
    String { chunk: &'a [u8], is_last: bool },
    BeginArray { count_hint: u64 },
    BeginObject { count_hint: u64 },
    EndContainer,
    /// The root value (and optional terminator) has been fully consumed.
    End,
}

/// Tracks one in-progress container.
#[derive(Clone, Copy)]
struct Frame {
    is_object: bool,
    /// In an object, whether the next scalar must be a key.
    expecting_key: bool,
    /// Open containers take elements past the hint until an explicit end byte.
    open: bool,
    /// Elements (arrays) or pairs (objects) still expected.
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

/// A BONJSON decoder over a byte slice.
///
/// Single-use: it walks exactly one document, either by pulling [`Event`]s
/// with [`next_event`](Self::next_event) or by pushing them into an
/// [`EventSink`] with [`decode`](Self::decode). After the first error the
/// context is poisoned and every further call fails with
/// [`Error::MisuseAfterError`].
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    frames: [Frame; limits::MAX_DEPTH],
    depth: usize,
    max_depth: usize,
    /// Mid chunked string: the next item in the input is a chunk header.
    in_string: bool,
    utf8: Utf8Validator,
    root_done: bool,
    finished: bool,
    poisoned: bool,
    /// Document fragments (spliced values) must not carry a terminator.
    accept_terminator: bool,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_max_depth(data, limits::MAX_DEPTH)
    }

    /// Create a new decoder with a lower nesting limit.
    /// Values above [`limits::MAX_DEPTH`] are clamped to it.
    #[must_use]
    pub fn with_max_depth(data: &'a [u8], max_depth: usize) -> Self {
        Self {
            data,
            pos: 0,
            frames: [Frame::EMPTY; limits::MAX_DEPTH],
            depth: 0,
            max_depth: max_depth.min(limits::MAX_DEPTH),
            in_string: false,
            utf8: Utf8Validator::new(),
            root_done: false,
            finished: false,
            poisoned: false,
            accept_terminator: true,
        }
    }

    /// A decoder for validating a spliced value: no terminator allowed.
    pub(crate) fn fragment(data: &'a [u8]) -> Self {
        let mut decoder = Self::new(data);
        decoder.accept_terminator = false;
        decoder
    }

    /// The current byte offset. After an error this is the offset at which
    /// the problem was detected.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if all input has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Run the whole document into a sink. Returns the number of bytes
    /// consumed; trailing bytes beyond the document are left for the caller
    /// to judge.
    pub fn decode<S: EventSink>(&mut self, sink: &mut S) -> Result<usize> {
        loop {
            let event = self.next_event()?;
            let delivered = match event {
                Event::Null => sink.on_null(),
                Event::Bool(v) => sink.on_bool(v),
                Event::Signed(v) => sink.on_signed(v),
                Event::Unsigned(v) => sink.on_unsigned(v),
                Event::Float(v) => sink.on_float(v),
                Event::BigNumber(v) => sink.on_big_number(v),
                Event::String { chunk, is_last } => sink.on_string(chunk, is_last),
                Event::BeginArray { count_hint } => sink.on_begin_array(count_hint),
                Event::BeginObject { count_hint } => sink.on_begin_object(count_hint),
                Event::EndContainer => sink.on_end_container(),
                Event::End => {
                    if let Err(e) = sink.on_end_data() {
                        self.poisoned = true;
                        return Err(e);
                    }
                    return Ok(self.pos);
                }
            };
            if let Err(e) = delivered {
                self.poisoned = true;
                return Err(e);
            }
        }
    }

    /// Pull the next event. [`Event::End`] is returned exactly once, when
    /// the root value is complete.
    pub fn next_event(&mut self) -> Result<Event<'a>> {
        if self.poisoned || self.finished {
            return Err(Error::MisuseAfterError);
        }
        match self.next_event_inner() {
            Ok(event) => Ok(event),
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    fn next_event_inner(&mut self) -> Result<Event<'a>> {
        // An unfinished chunked string owns the input until its last chunk.
        if self.in_string {
            return self.next_string_chunk();
        }

        // Counted containers close implicitly once their count is consumed.
        if self.depth > 0 {
            let frame = self.frames[self.depth - 1];
            if !frame.open && frame.remaining == 0 && (!frame.is_object || frame.expecting_key) {
                self.depth -= 1;
                self.note_value_end();
                return Ok(Event::EndContainer);
            }
        }

        if self.root_done {
            if self.accept_terminator
                && self.pos < self.data.len()
                && self.data[self.pos] == type_code::DOCUMENT_TERMINATOR
            {
                self.pos += 1;
            }
            self.finished = true;
            return Ok(Event::End);
        }

        let tc = self.read_byte()?;
        self.dispatch(tc)
    }

    fn dispatch(&mut self, tc: u8) -> Result<Event<'a>> {
        if type_code::is_small_int(tc) {
            self.check_value_position()?;
            self.note_value_end();
            return Ok(Event::Signed(type_code::small_int_value(tc)));
        }

        if type_code::is_unsigned_int(tc) {
            self.check_value_position()?;
            let size = type_code::unsigned_int_size(tc);
            let value = unpack_unsigned_le(self.read_bytes(size)?);
            if unsigned_byte_width(value) != size || value <= type_code::SMALLINT_BIAS as u64 {
                return Err(Error::not_canonical());
            }
            self.note_value_end();
            return Ok(if value <= i64::MAX as u64 {
                Event::Signed(value as i64)
            } else {
                Event::Unsigned(value)
            });
        }

        if type_code::is_signed_int(tc) {
            self.check_value_position()?;
            let size = type_code::signed_int_size(tc);
            let value = unpack_signed_le(self.read_bytes(size)?);
            // Canonical signed payloads are negative and below the small range;
            // everything else has a shorter unsigned or small-int form.
            if value >= -type_code::SMALLINT_BIAS || signed_byte_width(value) != size {
                return Err(Error::not_canonical());
            }
            self.note_value_end();
            return Ok(Event::Signed(value));
        }

        match tc {
            type_code::FLOAT64 => {
                self.check_value_position()?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.read_bytes(8)?);
                let value = f64::from_le_bytes(buf);
                if value.is_nan() || value.is_infinite() {
                    return Err(Error::InvalidFloat);
                }
                if !matches!(num::reduce_float(value), ReducedNumber::Float(_)) {
                    return Err(Error::not_canonical());
                }
                self.note_value_end();
                Ok(Event::Float(value))
            }
            type_code::BIG_NUMBER => {
                self.check_value_position()?;
                self.decode_big_number()
            }
            type_code::STRING => {
                let len = self.read_length()?;
                let bytes = self.read_bytes(len)?;
                validate_utf8(bytes)?;
                self.note_value_end();
                Ok(Event::String {
                    chunk: bytes,
                    is_last: true,
                })
            }
            type_code::STRING_CHUNKED => {
                self.utf8.reset();
                self.next_string_chunk()
            }
            type_code::ARRAY => self.begin_container(false),
            type_code::OBJECT => self.begin_container(true),
            type_code::CONTAINER_END => self.end_open_container(),
            type_code::NULL => {
                self.check_value_position()?;
                self.note_value_end();
                Ok(Event::Null)
            }
            type_code::FALSE => {
                self.check_value_position()?;
                self.note_value_end();
                Ok(Event::Bool(false))
            }
            type_code::TRUE => {
                self.check_value_position()?;
                self.note_value_end();
                Ok(Event::Bool(true))
            }
            _ => Err(Error::invalid_type_code(tc)),
        }
    }

    fn begin_container(&mut self, is_object: bool) -> Result<Event<'a>> {
        self.check_value_position()?;
        if self.depth >= self.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        let header = self.read_varint()?;
        let count = header >> 1;
        let open = header & 1 == 1;
        self.frames[self.depth] = Frame {
            is_object,
            expecting_key: is_object,
            open,
            remaining: count,
        };
        self.depth += 1;
        Ok(if is_object {
            Event::BeginObject { count_hint: count }
        } else {
            Event::BeginArray { count_hint: count }
        })
    }

    fn end_open_container(&mut self) -> Result<Event<'a>> {
        if self.depth == 0 {
            return Err(Error::UnbalancedContainer);
        }
        let frame = self.frames[self.depth - 1];
        // Counted containers close implicitly; a stray end byte, an end
        // before the declared minimum, or an end mid-pair is malformed.
        if !frame.open
            || frame.remaining > 0
            || (frame.is_object && !frame.expecting_key)
        {
            return Err(Error::UnbalancedContainer);
        }
        self.depth -= 1;
        self.note_value_end();
        Ok(Event::EndContainer)
    }

    fn next_string_chunk(&mut self) -> Result<Event<'a>> {
        let header = self.read_varint()?;
        let len = header >> 1;
        let more = header & 1 == 1;
        if len == 0 && more {
            return Err(Error::not_canonical());
        }
        if len > (self.data.len() - self.pos) as u64 {
            return Err(Error::truncated());
        }
        let bytes = self.read_bytes(len as usize)?;
        self.utf8.feed(bytes)?;
        self.in_string = more;
        if !more {
            self.utf8.finish()?;
            self.note_value_end();
        }
        Ok(Event::String {
            chunk: bytes,
            is_last: !more,
        })
    }

    fn decode_big_number(&mut self) -> Result<Event<'a>> {
        let signed_len = zigzag_decode(self.read_varint()?);
        if signed_len == 0 {
            // The value zero is a small int on the wire, never a big number.
            return Err(Error::not_canonical());
        }
        let sig_len = signed_len.unsigned_abs() as usize;
        if sig_len > limits::MAX_SIGNIFICAND_BYTES {
            return Err(Error::not_canonical());
        }
        let bytes = self.read_bytes(sig_len)?;
        if bytes[sig_len - 1] == 0 {
            return Err(Error::not_canonical());
        }
        let significand = unpack_unsigned_le(bytes);
        let exponent = zigzag_decode(self.read_varint()?);
        if exponent < i64::from(i32::MIN) || exponent > i64::from(i32::MAX) {
            return Err(Error::not_canonical());
        }
        let sign = if signed_len < 0 { -1 } else { 1 };
        let value = BigNumber::new(sign, significand, exponent as i32);
        // Anything that reduces to a simpler scalar (or a different big
        // number) should have been encoded as that instead.
        match num::reduce_big_number(value) {
            ReducedNumber::Big(reduced) if reduced == value => {
                self.note_value_end();
                Ok(Event::BigNumber(value))
            }
            _ => Err(Error::not_canonical()),
        }
    }

    /// Reject non-string events in an object key slot.
    fn check_value_position(&self) -> Result<()> {
        if self.depth > 0 {
            let frame = &self.frames[self.depth - 1];
            if frame.is_object && frame.expecting_key {
                return Err(Error::KeyMustBeString);
            }
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

    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(Error::truncated());
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.data.len() - self.pos {
            return Err(Error::truncated());
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    #[inline]
    fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = leb128_decode(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    /// Read a varint length and bound it by the remaining input.
    #[inline]
    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        if len > (self.data.len() - self.pos) as u64 {
            return Err(Error::truncated());
        }
        Ok(len as usize)
    }
}

/// Decode one document, firing events into `sink`.
/// Returns the number of bytes consumed.
pub fn decode<S: EventSink>(data: &[u8], sink: &mut S) -> Result<usize> {
    Decoder::new(data).decode(sink)
}
