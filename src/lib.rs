//! tinylz — a small byte-oriented LZ-family compressor.
//!
//! The crate is layered bottom-up:
//!
//! - [`bitstream`] — the bit-granular reader/writer the token format rides on.
//! - [`token`] — the five-shape token encoding (literal, four match shapes,
//!   literal-run) and its cost model.
//! - [`matcher`] — the hash-chain match finder shared by every parse strategy.
//! - [`parser`] — greedy, lazy, and optimal parse strategies selected by
//!   [`parser::Level`].
//! - [`checksum`] — pluggable block and incremental checksums (Adler-32 by
//!   default).
//! - [`jobpool`] — the thread pool backing block-parallel stream encoding.
//! - [`block`] — one-shot compression/decompression of a single block.
//! - [`stream`] — the resumable, block-framed stream layer.

pub mod bitstream;
pub mod block;
pub mod checksum;
pub mod jobpool;
pub mod matcher;
pub mod parser;
pub mod stream;
pub mod token;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level convenience re-exports for the most common entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Compression effort level, from `FASTEST` (greedy, no look-ahead) to `MAX`
/// (full dynamic-programming optimal parse).
pub use parser::Level;

/// One-shot block compression into a freshly allocated buffer.
pub use block::compress_simple;
/// One-shot block decompression into a freshly allocated buffer of known size.
pub use block::decompress_simple;

/// Worst-case compressed size for a given input length. Use to size a
/// caller-owned destination buffer for [`block::compress`].
pub use block::compress_bound;

/// Error type for block-level compression.
pub use block::BlockError;

/// The resumable, block-framed output stream.
pub use stream::OutStream;
/// The resumable, block-framed input stream.
pub use stream::InStream;
/// Configuration shared by [`OutStream`] and [`InStream`].
pub use stream::StreamParams;
/// Error type for stream-level framing and I/O.
pub use stream::StreamError;

/// Maximum back-reference distance a match token can encode.
pub const MAX_DISTANCE: usize = matcher::MAX_DIST as usize;

/// Shortest run of literals worth encoding as a literal-run token rather
/// than one literal token per byte.
pub use token::MIN_LIT_RUN;

/// Shortest match length the token format can represent.
pub use token::MIN_MATCH;
