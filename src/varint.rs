//! BPS variable-length integers.
//!
//! Seven data bits per byte, least significant group first. A set high bit
//! marks the final byte. Every continuation adds the next group's weight to
//! the value, so each integer has exactly one encoding.

use crate::error::{BpsError, Result};

/// Forward-only reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Take the next `len` bytes, or `None` without advancing if fewer remain.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// Outcome of decoding one varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Varint {
    Value(u64),
    /// No bytes were left to read.
    EndOfStream,
    /// Bytes were read but the stream ended before a terminal byte.
    Truncated,
    /// The encoded value does not fit in a `u64`.
    Overflow,
}

impl Varint {
    /// A value that must be present; running out of bytes is a truncated patch.
    pub fn required(self, field: &'static str) -> Result<u64> {
        match self {
            Varint::Value(v) => Ok(v),
            Varint::EndOfStream | Varint::Truncated => Err(BpsError::TruncatedPatch { field }),
            Varint::Overflow => Err(BpsError::ValueOverflow { field }),
        }
    }

    /// A value whose absence is a clean end of stream.
    pub fn optional(self, field: &'static str) -> Result<Option<u64>> {
        match self {
            Varint::EndOfStream => Ok(None),
            other => other.required(field).map(Some),
        }
    }
}

/// Decode one integer from the front of `cursor`, advancing past it.
pub fn decode(cursor: &mut ByteCursor<'_>) -> Varint {
    let mut data: u64 = 0;
    let mut shift: u64 = 1;
    let mut first = true;

    loop {
        let Some(byte) = cursor.next_byte() else {
            return if first {
                Varint::EndOfStream
            } else {
                Varint::Truncated
            };
        };
        first = false;

        let digit = u64::from(byte & 0x7f);
        data = match digit.checked_mul(shift).and_then(|d| data.checked_add(d)) {
            Some(v) => v,
            None => return Varint::Overflow,
        };
        if byte & 0x80 != 0 {
            return Varint::Value(data);
        }

        shift = match shift.checked_mul(0x80) {
            Some(s) => s,
            None => return Varint::Overflow,
        };
        data = match data.checked_add(shift) {
            Some(v) => v,
            None => return Varint::Overflow,
        };
    }
}

/// Append the encoding of `value` to `out`.
pub fn encode(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let digit = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(digit | 0x80);
            return;
        }
        out.push(digit);
        value -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode(value, &mut out);
        out
    }

    #[test]
    fn test_single_byte_values() {
        assert_eq!(encoded(0), vec![0x80]);
        assert_eq!(encoded(127), vec![0xff]);
        assert_eq!(decode(&mut ByteCursor::new(&[0x85])), Varint::Value(5));
    }

    #[test]
    fn test_two_byte_boundary() {
        // 128 is the first value that needs a continuation byte, and the bias
        // means it is encoded with two zero digits.
        assert_eq!(encoded(128), vec![0x00, 0x80]);
        assert_eq!(decode(&mut ByteCursor::new(&[0x00, 0x80])), Varint::Value(128));
        assert_eq!(decode(&mut ByteCursor::new(&[0x7f, 0x80])), Varint::Value(255));
        assert_eq!(encoded(16511), vec![0x7f, 0xff]);
        assert_eq!(encoded(16512), vec![0x00, 0x00, 0x80]);
    }

    #[test]
    fn test_decode_advances_cursor() {
        let bytes = [0x00, 0x80, 0x83, 0x01];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(decode(&mut cursor), Varint::Value(128));
        assert_eq!(cursor.position(), 2);
        assert_eq!(decode(&mut cursor), Varint::Value(3));
        assert_eq!(cursor.rest(), &[0x01u8][..]);
    }

    #[test]
    fn test_empty_is_end_of_stream() {
        let mut cursor = ByteCursor::new(&[]);
        assert_eq!(decode(&mut cursor), Varint::EndOfStream);
        assert_eq!(Varint::EndOfStream.optional("action"), Ok(None));
    }

    #[test]
    fn test_missing_terminal_byte_is_truncated() {
        let mut cursor = ByteCursor::new(&[0x12, 0x34]);
        assert_eq!(decode(&mut cursor), Varint::Truncated);
        assert_eq!(
            Varint::Truncated.optional("action"),
            Err(BpsError::TruncatedPatch { field: "action" })
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut bytes = vec![0x7f; 10];
        bytes.push(0xff);
        assert_eq!(decode(&mut ByteCursor::new(&bytes)), Varint::Overflow);
        assert_eq!(
            Varint::Overflow.required("source size"),
            Err(BpsError::ValueOverflow { field: "source size" })
        );
    }

    #[test]
    fn test_u64_max_round_trips() {
        let bytes = encoded(u64::MAX);
        assert_eq!(decode(&mut ByteCursor::new(&bytes)), Varint::Value(u64::MAX));
    }

    #[test]
    fn test_take_does_not_advance_when_short() {
        let mut cursor = ByteCursor::new(&[1, 2, 3]);
        assert_eq!(cursor.take(4), None);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.take(2), Some(&[1u8, 2][..]));
        assert_eq!(cursor.remaining(), 1);
    }

    proptest! {
        #[test]
        fn prop_round_trip_u32_range(value in 0u64..(1u64 << 32)) {
            let bytes = encoded(value);
            let mut cursor = ByteCursor::new(&bytes);
            prop_assert_eq!(decode(&mut cursor), Varint::Value(value));
            prop_assert!(cursor.is_empty());
        }

        #[test]
        fn prop_round_trip_any(value in any::<u64>()) {
            let bytes = encoded(value);
            prop_assert_eq!(decode(&mut ByteCursor::new(&bytes)), Varint::Value(value));
        }

        #[test]
        fn prop_truncation_never_yields_a_value(value in 128u64..(1u64 << 32)) {
            let bytes = encoded(value);
            let cut = &bytes[..bytes.len() - 1];
            prop_assert_eq!(decode(&mut ByteCursor::new(cut)), Varint::Truncated);
        }
    }
}
