//! File header and per-block header framing.
//!
//! File header (2 bytes, written once at the start of a stream):
//!
//! ```text
//! byte 0: bits 0-4 = log2(block_size), bits 5-7 = flags
//!         bit 5: independent blocks
//!         bit 6: block checksum present
//!         bit 7: incremental checksum present
//! byte 1: bitwise NOT of byte 0 (cheap corruption check)
//! ```
//!
//! Per-block header (4 bytes, little-endian, one per block):
//!
//! ```text
//! bits 0-29:  block length on the wire (compressed length, or the raw
//!             length when the uncompressed-fallback flag is set)
//! bit 30:     UNCOMPRESSED_BLOCK_MASK — body stored verbatim
//! bit 31:     PARTIAL_BLOCK_MASK — block is shorter than block_size;
//!             a 4-byte uncompressed-size field follows the header
//! ```
//!
//! A header word of `0` marks end of stream.

use super::params::{StreamError, StreamParams};

pub const BLOCK_LEN_MASK: u32 = (1 << 30) - 1;
pub const UNCOMPRESSED_BLOCK_MASK: u32 = 1 << 30;
pub const PARTIAL_BLOCK_MASK: u32 = 1 << 31;

pub const FLAG_INDEPENDENT_BLOCKS: u8 = 1 << 0;
pub const FLAG_BLOCK_CHECKSUM: u8 = 1 << 1;
pub const FLAG_INCREMENTAL_CHECKSUM: u8 = 1 << 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub block_size: usize,
    pub block_checksum: bool,
    pub incremental_checksum: bool,
    pub independent_blocks: bool,
}

impl FileHeader {
    pub fn from_params(params: &StreamParams) -> Self {
        FileHeader {
            block_size: params.block_size,
            block_checksum: params.block_checksum.is_some(),
            incremental_checksum: params.incremental_checksum.is_some(),
            independent_blocks: params.independent_blocks,
        }
    }

    pub fn encode(&self) -> [u8; 2] {
        let log2 = self.block_size.trailing_zeros() as u8;
        let mut flags = 0u8;
        if self.block_checksum {
            flags |= FLAG_BLOCK_CHECKSUM;
        }
        if self.incremental_checksum {
            flags |= FLAG_INCREMENTAL_CHECKSUM;
        }
        if self.independent_blocks {
            flags |= FLAG_INDEPENDENT_BLOCKS;
        }
        let byte0 = (log2 & 0x1F) | (flags << 5);
        [byte0, !byte0]
    }

    pub fn decode(bytes: [u8; 2]) -> Result<Self, StreamError> {
        if bytes[1] != !bytes[0] {
            return Err(StreamError::CorruptInput);
        }
        let log2 = bytes[0] & 0x1F;
        let flags = bytes[0] >> 5;
        Ok(FileHeader {
            block_size: 1usize << log2,
            block_checksum: flags & FLAG_BLOCK_CHECKSUM != 0,
            incremental_checksum: flags & FLAG_INCREMENTAL_CHECKSUM != 0,
            independent_blocks: flags & FLAG_INDEPENDENT_BLOCKS != 0,
        })
    }
}

/// Packs a block header word.
pub fn pack_block_header(len: u32, uncompressed: bool, partial: bool) -> u32 {
    debug_assert!(len <= BLOCK_LEN_MASK);
    let mut word = len & BLOCK_LEN_MASK;
    if uncompressed {
        word |= UNCOMPRESSED_BLOCK_MASK;
    }
    if partial {
        word |= PARTIAL_BLOCK_MASK;
    }
    word
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub len: u32,
    pub uncompressed: bool,
    pub partial: bool,
}

pub fn unpack_block_header(word: u32) -> Option<BlockHeader> {
    if word == 0 {
        return None;
    }
    Some(BlockHeader {
        len: word & BLOCK_LEN_MASK,
        uncompressed: word & UNCOMPRESSED_BLOCK_MASK != 0,
        partial: word & PARTIAL_BLOCK_MASK != 0,
    })
}

pub const END_OF_STREAM: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_round_trips() {
        let header = FileHeader {
            block_size: 65536,
            block_checksum: true,
            incremental_checksum: false,
            independent_blocks: true,
        };
        let bytes = header.encode();
        assert_eq!(FileHeader::decode(bytes).unwrap(), header);
    }

    #[test]
    fn file_header_rejects_flipped_check_byte() {
        let mut bytes = FileHeader {
            block_size: 1024,
            block_checksum: false,
            incremental_checksum: true,
            independent_blocks: false,
        }
        .encode();
        bytes[1] ^= 0x01;
        assert_eq!(FileHeader::decode(bytes), Err(StreamError::CorruptInput));
    }

    #[test]
    fn block_header_round_trips() {
        let word = pack_block_header(12345, false, true);
        let decoded = unpack_block_header(word).unwrap();
        assert_eq!(decoded.len, 12345);
        assert!(!decoded.uncompressed);
        assert!(decoded.partial);
    }

    #[test]
    fn zero_word_is_end_of_stream() {
        assert!(unpack_block_header(END_OF_STREAM).is_none());
    }
}
