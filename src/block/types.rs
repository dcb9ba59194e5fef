//! Shared constants and the block-level error type.

pub use crate::matcher::MAX_DIST;
pub use crate::parser::Level;
pub use crate::token::{MIN_LIT_RUN, MIN_MATCH};

/// Errors from one-shot block compression/decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// The destination buffer was too small to hold the result.
    OutputTooSmall,
    /// The compressed input is structurally invalid (bad token, truncated
    /// stream, back-reference outside the decoded window, or a literal run
    /// shorter than `MIN_LIT_RUN`).
    CorruptInput,
}

impl core::fmt::Display for BlockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BlockError::OutputTooSmall => write!(f, "destination buffer too small"),
            BlockError::CorruptInput => write!(f, "corrupt compressed block"),
        }
    }
}

impl std::error::Error for BlockError {}

impl From<crate::token::TokenError> for BlockError {
    fn from(_: crate::token::TokenError) -> Self {
        BlockError::CorruptInput
    }
}

impl From<crate::bitstream::BitReadError> for BlockError {
    fn from(_: crate::bitstream::BitReadError) -> Self {
        BlockError::CorruptInput
    }
}
