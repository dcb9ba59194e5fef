//! Stream configuration.

use crate::checksum::{self, BlockChecksum, IncrementalChecksum};
use crate::parser::Level;
use std::sync::Arc;

pub const MIN_BLOCK_SIZE: usize = 1 << 10;
pub const MAX_BLOCK_SIZE: usize = 1 << 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// A parameter failed validation at `open()` time.
    InvalidParams,
    /// The underlying reader/writer returned an error.
    Io,
    /// The framed stream is structurally invalid (bad header, bad block
    /// length, checksum mismatch, or a block body that failed to decode).
    CorruptInput,
    /// A previous call on this handle already failed; the handle no
    /// longer attempts further I/O.
    PreviouslyFailed,
}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StreamError::InvalidParams => write!(f, "invalid stream parameters"),
            StreamError::Io => write!(f, "stream I/O error"),
            StreamError::CorruptInput => write!(f, "corrupt framed stream"),
            StreamError::PreviouslyFailed => write!(f, "stream handle already failed"),
        }
    }
}

impl std::error::Error for StreamError {}

/// Configuration for [`super::encoder::OutStream`] / [`super::decoder::InStream`].
#[derive(Clone)]
pub struct StreamParams {
    pub block_size: usize,
    pub independent_blocks: bool,
    pub block_checksum: Option<Arc<BlockChecksum>>,
    pub incremental_checksum: Option<Arc<IncrementalChecksum>>,
    pub initial_checksum: u32,
    pub level: Level,
    /// Number of worker threads used by the encoder. `1` disables the
    /// job-pool path entirely and compresses one block at a time inline.
    pub num_threads: usize,
    /// Whether `OutStream::open` emits the 2-byte file header.
    pub write_header: bool,
}

impl Default for StreamParams {
    fn default() -> Self {
        StreamParams {
            block_size: 65536,
            independent_blocks: false,
            block_checksum: None,
            incremental_checksum: Some(checksum::adler32_incremental_checksum()),
            initial_checksum: checksum::ADLER32_SEED,
            level: Level::MEDIUM,
            num_threads: 1,
            write_header: true,
        }
    }
}

impl StreamParams {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_independent_blocks(mut self, independent: bool) -> Self {
        self.independent_blocks = independent;
        self
    }

    pub fn with_block_checksum(mut self, enabled: bool) -> Self {
        self.block_checksum = if enabled {
            Some(checksum::adler32_block_checksum())
        } else {
            None
        };
        self
    }

    pub fn with_incremental_checksum(mut self, enabled: bool) -> Self {
        self.incremental_checksum = if enabled {
            Some(checksum::adler32_incremental_checksum())
        } else {
            None
        };
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = n.max(1);
        self
    }

    pub fn context_size(&self) -> usize {
        if self.independent_blocks {
            0
        } else {
            self.block_size.min(crate::matcher::MAX_DIST as usize + 1)
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.block_size < MIN_BLOCK_SIZE
            || self.block_size > MAX_BLOCK_SIZE
            || !self.block_size.is_power_of_two()
        {
            return Err(StreamError::InvalidParams);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_validate() {
        assert!(StreamParams::default().validate().is_ok());
    }

    #[test]
    fn non_power_of_two_block_size_is_rejected() {
        let params = StreamParams::default().with_block_size(70000);
        assert_eq!(params.validate(), Err(StreamError::InvalidParams));
    }

    #[test]
    fn out_of_range_block_size_is_rejected() {
        let too_small = StreamParams::default().with_block_size(256);
        assert_eq!(too_small.validate(), Err(StreamError::InvalidParams));
    }

    #[test]
    fn independent_blocks_have_no_context() {
        let params = StreamParams::default().with_independent_blocks(true);
        assert_eq!(params.context_size(), 0);
    }
}
