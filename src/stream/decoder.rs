//! The resumable, block-framed input stream.

use std::io::Read;

use super::header::{self, FileHeader};
use super::params::{StreamError, StreamParams};
use crate::block;

pub struct InStream<R: Read> {
    reader: R,
    params: StreamParams,
    context_size: usize,
    context: Vec<u8>,
    has_history: bool,
    incremental: u32,
    finished: bool,
    errored: bool,
    /// Decoded bytes not yet handed back to the caller.
    pending: Vec<u8>,
    pending_pos: usize,
}

impl<R: Read> InStream<R> {
    /// Opens a stream, reading and validating the file header when
    /// `params.write_header` is set. `params` otherwise describes the
    /// framing to expect (block size, checksum presence, independence) —
    /// callers that don't read the header themselves must supply the same
    /// parameters the encoder used.
    pub fn open(mut reader: R, mut params: StreamParams) -> Result<Self, StreamError> {
        if params.write_header {
            let mut bytes = [0u8; 2];
            reader.read_exact(&mut bytes).map_err(|_| StreamError::CorruptInput)?;
            let header = FileHeader::decode(bytes)?;
            params.block_size = header.block_size;
            params.independent_blocks = header.independent_blocks;
            if !header.block_checksum {
                params.block_checksum = None;
            } else if params.block_checksum.is_none() {
                params.block_checksum = Some(crate::checksum::adler32_block_checksum());
            }
            if !header.incremental_checksum {
                params.incremental_checksum = None;
            } else if params.incremental_checksum.is_none() {
                params.incremental_checksum = Some(crate::checksum::adler32_incremental_checksum());
            }
        }
        params.validate()?;
        let context_size = params.context_size();
        let initial_checksum = params.initial_checksum;
        Ok(InStream {
            reader,
            context_size,
            context: Vec::new(),
            has_history: false,
            incremental: initial_checksum,
            finished: false,
            errored: false,
            pending: Vec::new(),
            pending_pos: 0,
            params,
        })
    }

    fn check_alive(&self) -> Result<(), StreamError> {
        if self.errored {
            return Err(StreamError::PreviouslyFailed);
        }
        Ok(())
    }

    /// Reads up to `buf.len()` decoded bytes, returning how many were
    /// written (`0` at end of stream).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.check_alive()?;
        match self.read_inner(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.errored = true;
                Err(e)
            }
        }
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let mut written = 0;
        while written < buf.len() {
            if self.pending_pos < self.pending.len() {
                let n = (self.pending.len() - self.pending_pos).min(buf.len() - written);
                buf[written..written + n]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                written += n;
                continue;
            }
            if self.finished {
                break;
            }
            self.fill_next_block()?;
        }
        Ok(written)
    }

    fn fill_next_block(&mut self) -> Result<(), StreamError> {
        let mut header_bytes = [0u8; 4];
        self.reader
            .read_exact(&mut header_bytes)
            .map_err(|_| StreamError::CorruptInput)?;
        let word = u32::from_le_bytes(header_bytes);
        let Some(hdr) = header::unpack_block_header(word) else {
            self.finished = true;
            return self.verify_final_checksum();
        };

        let on_wire_len = hdr.len as usize;

        let expected_checksum = if self.params.block_checksum.is_some() {
            let mut sum_bytes = [0u8; 4];
            self.reader
                .read_exact(&mut sum_bytes)
                .map_err(|_| StreamError::CorruptInput)?;
            Some(u32::from_le_bytes(sum_bytes))
        } else {
            None
        };

        let uncompressed_size = if hdr.partial {
            let mut size_bytes = [0u8; 4];
            self.reader
                .read_exact(&mut size_bytes)
                .map_err(|_| StreamError::CorruptInput)?;
            u32::from_le_bytes(size_bytes) as usize
        } else {
            self.params.block_size
        };

        let mut wire_bytes = vec![0u8; on_wire_len];
        self.reader
            .read_exact(&mut wire_bytes)
            .map_err(|_| StreamError::CorruptInput)?;

        let raw = if hdr.uncompressed {
            wire_bytes
        } else {
            let context: &[u8] = if self.has_history { &self.context } else { &[] };
            decode_with_context(&wire_bytes, context, uncompressed_size)?
        };

        if let Some(f) = &self.params.block_checksum {
            let expected = expected_checksum.expect("checksum bytes read above when enabled");
            if f(&raw) != expected {
                return Err(StreamError::CorruptInput);
            }
        }

        if let Some(f) = &self.params.incremental_checksum {
            self.incremental = f(&raw, self.incremental);
        }

        if self.context_size > 0 {
            if raw.len() >= self.context_size {
                self.context = raw[raw.len() - self.context_size..].to_vec();
            } else {
                self.context = raw.clone();
            }
            self.has_history = true;
        }

        self.pending = raw;
        self.pending_pos = 0;
        Ok(())
    }

    fn verify_final_checksum(&mut self) -> Result<(), StreamError> {
        if self.params.incremental_checksum.is_some() {
            let mut bytes = [0u8; 4];
            self.reader
                .read_exact(&mut bytes)
                .map_err(|_| StreamError::CorruptInput)?;
            let expected = u32::from_le_bytes(bytes);
            if expected != self.incremental {
                return Err(StreamError::CorruptInput);
            }
        }
        Ok(())
    }

    pub fn close(self) -> Result<R, StreamError> {
        self.check_alive()?;
        Ok(self.reader)
    }
}

fn decode_with_context(
    wire: &[u8],
    context: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>, StreamError> {
    if context.is_empty() {
        block::decompress_simple(wire, uncompressed_size).map_err(|_| StreamError::CorruptInput)
    } else {
        block::decompress_with_context(wire, context, uncompressed_size)
            .map_err(|_| StreamError::CorruptInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::encoder::OutStream;

    #[test]
    fn round_trips_a_small_stream() {
        let data = b"hello, framed world! hello, framed world! hello, framed world!".to_vec();
        let params = StreamParams::default().with_block_size(1024);

        let mut out = OutStream::open(Vec::new(), params.clone()).unwrap();
        out.write(&data).unwrap();
        let framed = out.close().unwrap();

        let mut instream = InStream::open(framed.as_slice(), params).unwrap();
        let mut decoded = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            let n = instream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            decoded.extend_from_slice(&buf[..n]);
        }
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_multiple_dependent_blocks() {
        // Several full blocks plus a partial tail, repetitive enough that
        // later blocks actually reference earlier ones' context.
        let mut data = Vec::new();
        for i in 0..5000u32 {
            data.extend_from_slice(format!("row {} ", i % 40).as_bytes());
        }
        let params = StreamParams::default().with_block_size(1024);
        assert!(!params.independent_blocks);

        let mut out = OutStream::open(Vec::new(), params.clone()).unwrap();
        out.write(&data).unwrap();
        let framed = out.close().unwrap();

        let mut instream = InStream::open(framed.as_slice(), params).unwrap();
        let mut decoded = Vec::new();
        let mut buf = [0u8; 777];
        loop {
            let n = instream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            decoded.extend_from_slice(&buf[..n]);
        }
        assert_eq!(decoded, data);
    }
}
