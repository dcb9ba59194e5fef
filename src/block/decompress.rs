//! One-shot block decompression: a bounds-checked safe path and a
//! trusting-caller unsafe fast path.

use super::types::BlockError;
use crate::bitstream::BitReader;
use crate::token::{self, DecodedToken};

/// Decodes `src` into `dst`, stopping once exactly `dst.len()` bytes have
/// been produced. Every back-reference and every literal/escape byte read
/// is bounds-checked against what has actually been decoded so far.
pub fn decompress_safe(src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
    let out = decode_checked(src, &[], dst.len())?;
    dst[..out.len()].copy_from_slice(&out);
    Ok(out.len())
}

/// Decodes `src` into `target_len` fresh bytes, allowing back-references
/// into `context` (the tail of a preceding block) as well as into the
/// bytes already produced for this block.
pub fn decompress_with_context(
    src: &[u8],
    context: &[u8],
    target_len: usize,
) -> Result<Vec<u8>, BlockError> {
    let out = decode_checked(src, context, target_len)?;
    Ok(out[context.len()..].to_vec())
}

fn decode_checked(src: &[u8], context: &[u8], target_len: usize) -> Result<Vec<u8>, BlockError> {
    let mut reader = BitReader::new(src);
    let mut out: Vec<u8> = Vec::with_capacity(context.len() + target_len);
    out.extend_from_slice(context);
    let goal = context.len() + target_len;

    while out.len() < goal {
        let tok = token::decode_next(&mut reader)?;
        match tok {
            DecodedToken::Literal(b) => out.push(b),
            DecodedToken::Match { dist, len } => {
                let dist = dist as usize;
                if dist == 0 || dist > out.len() {
                    return Err(BlockError::CorruptInput);
                }
                let start = out.len() - dist;
                for k in 0..len as usize {
                    if out.len() >= goal {
                        break;
                    }
                    let b = out[start + k];
                    out.push(b);
                }
            }
            DecodedToken::LiteralRun { len } => {
                let bytes = reader.get_bytes(len as usize)?;
                out.extend_from_slice(bytes);
            }
        }
        if out.len() > goal {
            return Err(BlockError::CorruptInput);
        }
    }

    Ok(out)
}

/// Decodes `src` into a freshly allocated buffer of exactly
/// `decompressed_size` bytes.
pub fn decompress_simple(src: &[u8], decompressed_size: usize) -> Result<Vec<u8>, BlockError> {
    let mut dst = vec![0u8; decompressed_size];
    let n = decompress_safe(src, &mut dst)?;
    dst.truncate(n);
    Ok(dst)
}

/// Decodes `src` into `dst` without the safe path's per-token bounds
/// checks on literal/escape reads — the caller is trusted to supply a
/// `dst` large enough for the decompressed payload and an `src` that
/// genuinely was produced by this crate's encoder. Matches are still
/// copied byte-by-byte when the source and destination ranges of the copy
/// overlap (the common case for run-length patterns), since a wider
/// unrolled copy would read bytes not yet written.
///
/// # Safety
/// `src` must decode, without error, to no more than `dst.len()` bytes
/// under [`decompress_safe`]. Passing untrusted input is undefined
/// behavior.
pub unsafe fn decompress_unsafe(src: &[u8], dst: &mut [u8]) -> usize {
    let mut reader = BitReader::new(src);
    let mut written = 0usize;

    while written < dst.len() {
        let tok = token::decode_next(&mut reader).expect("caller guarantees a valid stream");
        match tok {
            DecodedToken::Literal(b) => {
                dst[written] = b;
                written += 1;
            }
            DecodedToken::Match { dist, len } => {
                let dist = dist as usize;
                let start = written - dist;
                if dist >= 4 {
                    let mut src_i = start;
                    let mut dst_i = written;
                    let mut remaining = len as usize;
                    while remaining >= 4 {
                        let chunk = [
                            dst[src_i],
                            dst[src_i + 1],
                            dst[src_i + 2],
                            dst[src_i + 3],
                        ];
                        dst[dst_i..dst_i + 4].copy_from_slice(&chunk);
                        src_i += 4;
                        dst_i += 4;
                        remaining -= 4;
                    }
                    for k in 0..remaining {
                        dst[dst_i + k] = dst[src_i + k];
                    }
                } else {
                    for k in 0..len as usize {
                        dst[written + k] = dst[start + k];
                    }
                }
                written += len as usize;
            }
            DecodedToken::LiteralRun { len } => {
                let bytes = reader
                    .get_bytes(len as usize)
                    .expect("caller guarantees a valid stream");
                dst[written..written + bytes.len()].copy_from_slice(bytes);
                written += bytes.len();
            }
        }
    }
    written
}
