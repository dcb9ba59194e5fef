//! Pluggable checksum callbacks.
//!
//! The stream framer never hard-codes a checksum algorithm: block and
//! incremental checksums are supplied as `Send + Sync` closures so they can
//! be shared across job-pool workers. Adler-32, the algorithm this crate's
//! default stream parameters recommend, is provided as a ready-to-use
//! default built on the `adler` crate.

use std::sync::Arc;

/// Computes a standalone checksum over one block's bytes.
pub type BlockChecksum = dyn Fn(&[u8]) -> u32 + Send + Sync;
/// Folds one block's bytes into a running checksum, given the checksum of
/// everything before it.
pub type IncrementalChecksum = dyn Fn(&[u8], u32) -> u32 + Send + Sync;

/// Adler-32 block checksum (seeded fresh for every block).
pub fn adler32(data: &[u8]) -> u32 {
    adler::adler32_slice(data)
}

/// Adler-32 incremental checksum: folds `data` into the running value
/// `prev`. `prev` is `1` (Adler-32's multiplicative identity) for the first
/// call.
pub fn adler32_update(data: &[u8], prev: u32) -> u32 {
    let mut h = adler::Adler32::from_checksum(prev);
    h.write_slice(data);
    h.checksum()
}

/// Seed value for [`adler32_update`]'s first call.
pub const ADLER32_SEED: u32 = 1;

/// Wraps [`adler32`] as a boxed [`BlockChecksum`].
pub fn adler32_block_checksum() -> Arc<BlockChecksum> {
    Arc::new(adler32)
}

/// Wraps [`adler32_update`] as a boxed [`IncrementalChecksum`].
pub fn adler32_incremental_checksum() -> Arc<IncrementalChecksum> {
    Arc::new(adler32_update)
}
