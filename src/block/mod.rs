//! One-shot block compression and decompression: the bitstream, token, and
//! matcher layers wired together behind a small, allocation-aware API.

pub mod compress;
pub mod decompress;
pub mod types;

pub use compress::{compress, compress_bound, compress_simple};
pub use decompress::{decompress_safe, decompress_simple, decompress_unsafe, decompress_with_context};
pub use types::{BlockError, Level, MAX_DIST, MIN_LIT_RUN, MIN_MATCH};
