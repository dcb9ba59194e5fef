//! One-shot block compression.

use super::types::BlockError;
use crate::parser::{self, Level};

/// Worst-case output size for a block of `src_len` bytes: every byte ends
/// up a literal (one control bit plus the raw byte), plus one 3-byte
/// accumulator slot per 24 control bits, plus a small fixed margin for the
/// slot the encoder always has open at the end.
pub fn compress_bound(src_len: usize) -> usize {
    src_len + 3 * (src_len / 24 + 1) + 16
}

/// Compresses `src` into a freshly allocated buffer at the given level.
pub fn compress_simple(src: &[u8], level: Level) -> Vec<u8> {
    parser::compress(src, level)
}

/// Compresses `src` into `dst`, returning the number of bytes written.
/// `bytes_before_src`, when non-empty, is a preceding context window the
/// matcher may reference back into (dependent-block framing); its length
/// must not exceed [`crate::matcher::MAX_DIST`] + 1.
pub fn compress(
    src: &[u8],
    dst: &mut [u8],
    level: Level,
    bytes_before_src: &[u8],
) -> Result<usize, BlockError> {
    let encoded = if bytes_before_src.is_empty() {
        parser::compress(src, level)
    } else {
        parser::compress_with_context(bytes_before_src, src, level)
    };
    if encoded.len() > dst.len() {
        return Err(BlockError::OutputTooSmall);
    }
    dst[..encoded.len()].copy_from_slice(&encoded);
    Ok(encoded.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_covers_worst_case_all_literals() {
        let src = vec![0u8; 1000];
        let mut dst = vec![0u8; compress_bound(src.len())];
        let n = compress(&src, &mut dst, Level::FASTEST, &[]).unwrap();
        assert!(n <= dst.len());
    }

    #[test]
    fn too_small_destination_is_rejected() {
        let src = vec![1u8; 64];
        let mut dst = vec![0u8; 1];
        assert_eq!(
            compress(&src, &mut dst, Level::MEDIUM, &[]),
            Err(BlockError::OutputTooSmall)
        );
    }
}
