//! The five token shapes: literal, tiny/short/short-2/full match, and the
//! literal-run special case.
//!
//! Every token starts with one control bit: `0` means "a literal byte
//! follows", `1` means "a 2-bit shape tag follows". The tag bits are
//! consumed in order (first bit, then second bit) and select one of four
//! field layouts:
//!
//! | first | second | shape  | fields                                          |
//! |-------|--------|--------|--------------------------------------------------|
//! | 0     | 0      | tiny   | 3 control bits = len-MIN_MATCH, 1 byte = dist-1   |
//! | 1     | 0      | short  | 2 raw bytes: low 13 bits dist, high 3 bits len    |
//! | 0     | 1      | short2 | 3 control bits = len-MIN_MATCH, 2 bytes = dist    |
//! | 1     | 1      | full   | length field (1 or 3 bytes), then 2 bytes = dist  |
//!
//! Tiny is the only shape that offsets its distance field by one; the other
//! three store `dist` directly, since a genuine match never has `dist == 0`
//! — that value is reserved, in the `full` shape only, as the literal-run
//! marker.
//!
//! The `full` shape's length field is a single raw byte holding
//! `min(len-MIN_MATCH, 255)`; a value of `255` means "two more raw bytes
//! follow, holding the real `len-MIN_MATCH` as a little-endian `u16`" — a
//! one-shot escape, not a repeating continuation ladder.
//!
//! A literal run is a `full`-shape token with `dist == 0`. Its length field
//! is repurposed as a flag: `3` means one more raw byte follows holding
//! `run_len - MIN_LIT_RUN`, `4` means two more raw bytes (little-endian)
//! hold it instead. The run's bytes themselves follow directly after.

use crate::bitstream::{BitReadError, BitReader, BitWriter};

pub const MIN_MATCH: u32 = 3;
pub const MIN_LIT_RUN: u32 = 36;

/// Largest distance any shape can encode.
pub const MAX_DIST: u32 = 65535;
/// Largest `len - MIN_MATCH` the `full` shape's escaped length field can hold.
pub const MAX_LEN_FIELD: u32 = u16::MAX as u32;

const TINY_DIST_MAX: u32 = 256;
const SHORT_DIST_LIMIT: u32 = 8192;
const TINY_LEN_LIMIT: u32 = 8; // len - MIN_MATCH must be < this to be "tiny length"

const LIT_RUN_SHORT_FLAG: u32 = MIN_MATCH; // 3: one more byte follows
const LIT_RUN_LONG_FLAG: u32 = MIN_MATCH + 1; // 4: two more bytes follow

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Tiny,
    Short,
    Short2,
    Full,
}

impl Shape {
    #[inline]
    fn tag(self) -> u32 {
        match self {
            Shape::Tiny => 0b00,
            Shape::Short => 0b01,
            Shape::Short2 => 0b10,
            Shape::Full => 0b11,
        }
    }

    #[inline]
    fn from_tag(tag: u32) -> Shape {
        match tag {
            0b00 => Shape::Tiny,
            0b01 => Shape::Short,
            0b10 => Shape::Short2,
            _ => Shape::Full,
        }
    }
}

/// Picks the cheapest shape that can represent `(dist, len)`. Callers must
/// ensure `len > MIN_MATCH` and `1 <= dist <= MAX_DIST`.
#[inline]
pub fn classify(dist: u32, len: u32) -> Shape {
    let tiny_len = len - MIN_MATCH < TINY_LEN_LIMIT;
    if tiny_len {
        if dist <= TINY_DIST_MAX {
            Shape::Tiny
        } else if dist < SHORT_DIST_LIMIT {
            Shape::Short
        } else {
            Shape::Short2
        }
    } else {
        Shape::Full
    }
}

/// Estimates the bit cost of encoding `(dist, len)` as a match, used by the
/// optimal parser's dynamic-programming cost pass. This mirrors the real
/// wire cost exactly (unlike a fuzzy proxy), since the shapes here have a
/// fixed bit count per field.
pub fn estimate_bits(dist: u32, len: u32) -> u32 {
    match classify(dist, len) {
        Shape::Tiny => 3 + 3 + 8,
        Shape::Short => 3 + 16,
        Shape::Short2 => 3 + 3 + 16,
        Shape::Full => {
            let escape = if len - MIN_MATCH >= 255 { 16 } else { 0 };
            3 + 8 + 16 + escape
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    DistanceOutOfRange,
    LengthOutOfRange,
    Truncated,
    CorruptInput,
}

impl From<BitReadError> for TokenError {
    fn from(_: BitReadError) -> Self {
        TokenError::Truncated
    }
}

impl core::fmt::Display for TokenError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenError::DistanceOutOfRange => write!(f, "match distance out of range"),
            TokenError::LengthOutOfRange => write!(f, "match length out of range"),
            TokenError::Truncated => write!(f, "token stream truncated"),
            TokenError::CorruptInput => write!(f, "corrupt token stream"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Writes the `full` shape's length field: one raw byte, escaping to a
/// 2-byte little-endian value when it would saturate.
fn write_full_length(writer: &mut BitWriter, out: &mut Vec<u8>, value: u32) {
    if value < 255 {
        writer.put_byte(out, value as u8);
    } else {
        writer.put_byte(out, 255);
        writer.put_bytes(out, &(value as u16).to_le_bytes());
    }
}

fn read_full_length(reader: &mut BitReader) -> Result<u32, TokenError> {
    let b = reader.get_byte()? as u32;
    if b < 255 {
        Ok(b)
    } else {
        let bytes = reader.get_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]) as u32)
    }
}

/// Writes one literal byte: control bit `0` followed by the raw byte.
pub fn encode_literal(writer: &mut BitWriter, out: &mut Vec<u8>, byte: u8) {
    writer.put_bit(out, 0);
    writer.put_byte(out, byte);
}

/// Writes a match token: control bit `1`, the 2-bit shape tag, then the
/// shape's fields. A match of length `<= MIN_MATCH` is never emitted as a
/// match (callers must re-emit those bytes as literals instead).
pub fn encode_match(
    writer: &mut BitWriter,
    out: &mut Vec<u8>,
    dist: u32,
    len: u32,
) -> Result<(), TokenError> {
    if dist == 0 || dist > MAX_DIST {
        return Err(TokenError::DistanceOutOfRange);
    }
    if len <= MIN_MATCH || len - MIN_MATCH > MAX_LEN_FIELD {
        return Err(TokenError::LengthOutOfRange);
    }
    let shape = classify(dist, len);
    writer.put_bit(out, 1);
    writer.put_bits(out, shape.tag(), 2);
    match shape {
        Shape::Tiny => {
            writer.put_bits(out, len - MIN_MATCH, 3);
            writer.put_byte(out, (dist - 1) as u8);
        }
        Shape::Short => {
            let value: u16 = (dist as u16) | (((len - MIN_MATCH) as u16) << 13);
            writer.put_bytes(out, &value.to_le_bytes());
        }
        Shape::Short2 => {
            writer.put_bits(out, len - MIN_MATCH, 3);
            writer.put_bytes(out, &(dist as u16).to_le_bytes());
        }
        Shape::Full => {
            write_full_length(writer, out, len - MIN_MATCH);
            writer.put_bytes(out, &(dist as u16).to_le_bytes());
        }
    }
    Ok(())
}

/// Writes a literal-run token: a `full` shape with distance field `0`. The
/// run's bytes themselves are *not* written here (the caller copies them
/// directly into the output immediately after). `run_len` must fall in
/// `MIN_LIT_RUN..=(MIN_LIT_RUN + u16::MAX)`.
pub fn encode_literal_run(writer: &mut BitWriter, out: &mut Vec<u8>, run_len: u32) {
    debug_assert!(run_len >= MIN_LIT_RUN);
    debug_assert!(run_len - MIN_LIT_RUN <= u16::MAX as u32);
    let long = run_len > 255 + MIN_LIT_RUN;
    writer.put_bit(out, 1);
    writer.put_bits(out, Shape::Full.tag(), 2);
    let flag = if long { LIT_RUN_LONG_FLAG } else { LIT_RUN_SHORT_FLAG };
    write_full_length(writer, out, flag);
    writer.put_bytes(out, &0u16.to_le_bytes());
    let extra = run_len - MIN_LIT_RUN;
    if long {
        writer.put_bytes(out, &(extra as u16).to_le_bytes());
    } else {
        writer.put_byte(out, extra as u8);
    }
}

/// One decoded token, as handed back to the block decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedToken {
    Literal(u8),
    Match { dist: u32, len: u32 },
    LiteralRun { len: u32 },
}

/// Reads the next token from the bitstream.
pub fn decode_next(reader: &mut BitReader) -> Result<DecodedToken, TokenError> {
    let is_match = reader.get_bit()? == 1;
    if !is_match {
        return Ok(DecodedToken::Literal(reader.get_byte()?));
    }
    let tag = reader.get_bits(2)?;
    let shape = Shape::from_tag(tag);
    match shape {
        Shape::Tiny => {
            let len_field = reader.get_bits(3)?;
            let dist = reader.get_byte()? as u32 + 1;
            Ok(DecodedToken::Match {
                dist,
                len: len_field + MIN_MATCH,
            })
        }
        Shape::Short => {
            let bytes = reader.get_bytes(2)?;
            let value = u16::from_le_bytes([bytes[0], bytes[1]]);
            let dist = (value & 0x1FFF) as u32;
            let len_field = (value >> 13) as u32;
            Ok(DecodedToken::Match {
                dist,
                len: len_field + MIN_MATCH,
            })
        }
        Shape::Short2 => {
            let len_field = reader.get_bits(3)?;
            let bytes = reader.get_bytes(2)?;
            let dist = u16::from_le_bytes([bytes[0], bytes[1]]) as u32;
            Ok(DecodedToken::Match {
                dist,
                len: len_field + MIN_MATCH,
            })
        }
        Shape::Full => {
            let len_field = read_full_length(reader)?;
            let bytes = reader.get_bytes(2)?;
            let dist = u16::from_le_bytes([bytes[0], bytes[1]]) as u32;
            if dist == 0 {
                let run_len = match len_field {
                    LIT_RUN_SHORT_FLAG => reader.get_byte()? as u32 + MIN_LIT_RUN,
                    LIT_RUN_LONG_FLAG => {
                        let b = reader.get_bytes(2)?;
                        u16::from_le_bytes([b[0], b[1]]) as u32 + MIN_LIT_RUN
                    }
                    _ => return Err(TokenError::CorruptInput),
                };
                Ok(DecodedToken::LiteralRun { len: run_len })
            } else {
                Ok(DecodedToken::Match {
                    dist,
                    len: len_field + MIN_MATCH,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_match(dist: u32, len: u32) {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        encode_match(&mut w, &mut out, dist, len).unwrap();
        w.finish(&mut out);

        let mut r = BitReader::new(&out);
        match decode_next(&mut r).unwrap() {
            DecodedToken::Match { dist: d, len: l } => {
                assert_eq!(d, dist);
                assert_eq!(l, len);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn tiny_match_round_trips() {
        round_trip_match(1, 4);
        round_trip_match(256, 10);
    }

    #[test]
    fn short_match_round_trips() {
        round_trip_match(257, 4);
        round_trip_match(8191, 10);
    }

    #[test]
    fn short2_match_round_trips() {
        round_trip_match(8192, 4);
        round_trip_match(65535, 10);
    }

    #[test]
    fn full_match_round_trips_without_escape() {
        round_trip_match(1, MIN_MATCH + 8);
        round_trip_match(65535, MIN_MATCH + 254);
    }

    #[test]
    fn full_match_round_trips_with_escape() {
        round_trip_match(1, MIN_MATCH + 255);
        round_trip_match(65535, MIN_MATCH + u16::MAX as u32);
    }

    #[test]
    fn literal_round_trips() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        encode_literal(&mut w, &mut out, 0x42);
        w.finish(&mut out);
        let mut r = BitReader::new(&out);
        assert_eq!(decode_next(&mut r).unwrap(), DecodedToken::Literal(0x42));
    }

    #[test]
    fn literal_run_round_trips() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        encode_literal_run(&mut w, &mut out, MIN_LIT_RUN);
        w.finish(&mut out);
        let mut r = BitReader::new(&out);
        assert_eq!(
            decode_next(&mut r).unwrap(),
            DecodedToken::LiteralRun { len: MIN_LIT_RUN }
        );
    }

    #[test]
    fn literal_run_round_trips_at_short_field_boundary() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        encode_literal_run(&mut w, &mut out, MIN_LIT_RUN + 255);
        w.finish(&mut out);
        let mut r = BitReader::new(&out);
        assert_eq!(
            decode_next(&mut r).unwrap(),
            DecodedToken::LiteralRun {
                len: MIN_LIT_RUN + 255
            }
        );
    }

    #[test]
    fn literal_run_round_trips_with_long_field() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        encode_literal_run(&mut w, &mut out, MIN_LIT_RUN + 600);
        w.finish(&mut out);
        let mut r = BitReader::new(&out);
        assert_eq!(
            decode_next(&mut r).unwrap(),
            DecodedToken::LiteralRun {
                len: MIN_LIT_RUN + 600
            }
        );
    }

    #[test]
    fn rejects_out_of_range_distance() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        assert_eq!(
            encode_match(&mut w, &mut out, 0, 4),
            Err(TokenError::DistanceOutOfRange)
        );
        assert_eq!(
            encode_match(&mut w, &mut out, 70000, 4),
            Err(TokenError::DistanceOutOfRange)
        );
    }

    #[test]
    fn rejects_too_short_match() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        assert_eq!(
            encode_match(&mut w, &mut out, 1, 2),
            Err(TokenError::LengthOutOfRange)
        );
        // A length of exactly MIN_MATCH is reserved for literal re-emission,
        // not a match token.
        assert_eq!(
            encode_match(&mut w, &mut out, 1, MIN_MATCH),
            Err(TokenError::LengthOutOfRange)
        );
    }

    #[test]
    fn a_full_shape_with_dist_zero_and_an_unrecognized_flag_is_corrupt() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        w.put_bit(&mut out, 1);
        w.put_bits(&mut out, Shape::Full.tag(), 2);
        write_full_length(&mut w, &mut out, 5); // neither 3 nor 4
        w.put_bytes(&mut out, &0u16.to_le_bytes());
        w.finish(&mut out);

        let mut r = BitReader::new(&out);
        assert_eq!(decode_next(&mut r), Err(TokenError::CorruptInput));
    }
}
