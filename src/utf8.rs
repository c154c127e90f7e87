// ABOUTME: UTF-8 validation for string payloads.
// ABOUTME: Whole-slice validation plus a chunk-spanning validator with a 3-byte carry.

use crate::error::{Error, Result};

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

/// Result of a bulk scan: either everything validated, or a well-formed but
/// incomplete sequence starts at `start` and runs to the end of the slice.
enum Scan {
    Complete,
    Partial { start: usize },
}

#[cfg(feature = "simd-utf8")]
fn scan(bytes: &[u8]) -> Result<Scan> {
    match simdutf8::compat::from_utf8(bytes) {
        Ok(_) => Ok(Scan::Complete),
        Err(e) => match e.error_len() {
            Some(_) => Err(Error::InvalidUtf8),
            None => Ok(Scan::Partial {
                start: e.valid_up_to(),
            }),
        },
    }
}

#[cfg(not(feature = "simd-utf8"))]
fn scan(bytes: &[u8]) -> Result<Scan> {
    match std::str::from_utf8(bytes) {
        Ok(_) => Ok(Scan::Complete),
        Err(e) => match e.error_len() {
            Some(_) => Err(Error::InvalidUtf8),
            None => Ok(Scan::Partial {
                start: e.valid_up_to(),
            }),
        },
    }
}

/// Total encoded length of the sequence started by a lead byte.
fn sequence_len(lead: u8) -> Result<u8> {
    match lead {
        0xc2..=0xdf => Ok(2),
        0xe0..=0xef => Ok(3),
        0xf0..=0xf4 => Ok(4),
        _ => Err(Error::InvalidUtf8),
    }
}

/// Validates UTF-8 across string chunks that need not align with code point
/// boundaries. Carries at most 3 pending continuation bytes between chunks.
#[derive(Debug, Default)]
pub struct Utf8Validator {
    pending: [u8; 4],
    pending_len: u8,
    needed: u8,
}

impl Utf8Validator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: [0; 4],
            pending_len: 0,
            needed: 0,
        }
    }

    /// Discard any carried state, ready for a new string.
    pub fn reset(&mut self) {
        self.pending_len = 0;
        self.needed = 0;
    }

    /// Validate the next chunk of a string.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Result<()> {
        if self.pending_len > 0 {
            while self.pending_len < self.needed && !chunk.is_empty() {
                let byte = chunk[0];
                if byte & 0xc0 != 0x80 {
                    return Err(Error::InvalidUtf8);
                }
                self.pending[self.pending_len as usize] = byte;
                self.pending_len += 1;
                chunk = &chunk[1..];
            }
            if self.pending_len < self.needed {
                return Ok(()); // chunk exhausted mid-sequence
            }
            // The assembled sequence still has to pass the full check
            // (overlong forms and surrogates have valid-looking continuations).
            validate_utf8(&self.pending[..self.needed as usize])?;
            self.pending_len = 0;
            self.needed = 0;
        }

        match scan(chunk)? {
            Scan::Complete => Ok(()),
            Scan::Partial { start } => {
                let tail = &chunk[start..];
                self.needed = sequence_len(tail[0])?;
                self.pending[..tail.len()].copy_from_slice(tail);
                self.pending_len = tail.len() as u8;
                Ok(())
            }
        }
    }

    /// Check that the string ended on a code point boundary.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending_len > 0 {
            self.reset();
            return Err(Error::InvalidUtf8);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(chunks: &[&[u8]]) -> Result<()> {
        let mut v = Utf8Validator::new();
        for chunk in chunks {
            v.feed(chunk)?;
        }
        v.finish()
    }

    #[test]
    fn test_ascii_chunks() {
        assert!(feed_all(&[b"hello", b" ", b"world"]).is_ok());
        assert!(feed_all(&[b"", b"x"]).is_ok());
    }

    #[test]
    fn test_split_code_points() {
        // "é" = C3 A9 split across chunks
        assert!(feed_all(&[&[0x61, 0xc3], &[0xa9, 0x62]]).is_ok());
        // "€" = E2 82 AC split three ways
        assert!(feed_all(&[&[0xe2], &[0x82], &[0xac]]).is_ok());
        // "🎉" = F0 9F 8E 89 split 1+3
        assert!(feed_all(&[&[0xf0], &[0x9f, 0x8e, 0x89]]).is_ok());
    }

    #[test]
    fn test_truncated_sequence() {
        assert_eq!(feed_all(&[&[0xc3]]), Err(Error::InvalidUtf8));
        assert_eq!(feed_all(&[&[0xe2, 0x82]]), Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_invalid_sequences() {
        // Bare continuation byte
        assert_eq!(feed_all(&[&[0x80]]), Err(Error::InvalidUtf8));
        // Overlong "/" (C0 AF), split across chunks
        assert_eq!(feed_all(&[&[0xc0], &[0xaf]]), Err(Error::InvalidUtf8));
        // Surrogate U+D800 (ED A0 80), split across chunks
        assert_eq!(feed_all(&[&[0xed], &[0xa0, 0x80]]), Err(Error::InvalidUtf8));
        // Above U+10FFFF
        assert_eq!(feed_all(&[&[0xf5, 0x80, 0x80, 0x80]]), Err(Error::InvalidUtf8));
        // Wrong continuation after carried lead
        assert_eq!(feed_all(&[&[0xc3], &[0x41]]), Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_reset_clears_carry() {
        let mut v = Utf8Validator::new();
        v.feed(&[0xc3]).unwrap();
        v.reset();
        assert!(v.feed(b"plain").is_ok());
        assert!(v.finish().is_ok());
    }
}
