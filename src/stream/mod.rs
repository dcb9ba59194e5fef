//! The resumable, block-framed stream layer built on top of [`crate::block`].
//!
//! A stream is a sequence of independently-framed blocks, each with its own
//! header and optional checksum, separated from one-shot block compression
//! so that callers can compress or decompress data that arrives (or is
//! needed) in pieces over time — writes and reads don't need to line up
//! with block boundaries.

pub mod decoder;
pub mod encoder;
pub mod header;
pub mod params;

pub use decoder::InStream;
pub use encoder::OutStream;
pub use header::FileHeader;
pub use params::{StreamError, StreamParams};
