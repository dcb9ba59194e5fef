//! The resumable, block-framed output stream.
//!
//! `write()` accumulates bytes into a block-sized buffer and flushes a
//! block whenever that buffer fills. With `num_threads == 1` each full
//! block is compressed and written out immediately. With `num_threads > 1`,
//! full blocks accumulate into a batch of `num_threads` sub-blocks sharing
//! one preceding-context prefix; the batch is compressed in parallel on the
//! job pool, then its headers and bodies are emitted — and its bytes folded
//! into the running incremental checksum — strictly in submission order,
//! regardless of which worker finished first.

use std::io::Write;

use super::header::{self, FileHeader};
use super::params::{StreamError, StreamParams};
use crate::block;
use crate::jobpool::JobPool;

pub struct OutStream<W: Write> {
    writer: W,
    params: StreamParams,
    context_size: usize,
    /// `[0..context_size]` is the tail of the previously flushed data;
    /// `[context_size..]` is the block currently being filled, `ptr` bytes
    /// of it valid.
    buffer: Vec<u8>,
    ptr: usize,
    has_history: bool,
    incremental: u32,
    errored: bool,
    job_pool: Option<JobPool>,
    batch: Vec<Vec<u8>>,
    closed_out: bool,
}

impl<W: Write> OutStream<W> {
    pub fn open(writer: W, params: StreamParams) -> Result<Self, StreamError> {
        params.validate()?;
        let context_size = params.context_size();
        let job_pool = if params.num_threads > 1 {
            Some(JobPool::new(params.num_threads).map_err(|_| StreamError::InvalidParams)?)
        } else {
            None
        };
        let mut stream = OutStream {
            writer,
            context_size,
            buffer: vec![0u8; context_size + params.block_size],
            ptr: 0,
            has_history: false,
            incremental: params.initial_checksum,
            errored: false,
            job_pool,
            batch: Vec::new(),
            closed_out: false,
            params,
        };
        if stream.params.write_header {
            let header = FileHeader::from_params(&stream.params).encode();
            stream.writer.write_all(&header).map_err(|_| {
                stream.errored = true;
                StreamError::Io
            })?;
        }
        Ok(stream)
    }

    fn check_alive(&self) -> Result<(), StreamError> {
        if self.errored {
            return Err(StreamError::PreviouslyFailed);
        }
        Ok(())
    }

    /// Writes `buf`, returning the number of bytes consumed (always
    /// `buf.len()` unless a previous call already failed).
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        self.check_alive()?;
        match self.write_inner(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.errored = true;
                Err(e)
            }
        }
    }

    fn write_inner(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        let mut offset = 0;
        while offset < buf.len() {
            let block_capacity = self.params.block_size - self.ptr;
            let n = block_capacity.min(buf.len() - offset);
            let dst_start = self.context_size + self.ptr;
            self.buffer[dst_start..dst_start + n].copy_from_slice(&buf[offset..offset + n]);
            self.ptr += n;
            offset += n;
            if self.ptr == self.params.block_size {
                self.flush_full_block()?;
            }
        }
        Ok(buf.len())
    }

    fn advance_context(&mut self, just_flushed: &[u8]) {
        if self.context_size == 0 {
            return;
        }
        if just_flushed.len() >= self.context_size {
            let tail = &just_flushed[just_flushed.len() - self.context_size..];
            self.buffer[..self.context_size].copy_from_slice(tail);
        }
        self.has_history = true;
    }

    fn flush_full_block(&mut self) -> Result<(), StreamError> {
        if self.job_pool.is_some() {
            let block = self.buffer[self.context_size..self.context_size + self.ptr].to_vec();
            self.batch.push(block);
            self.ptr = 0;
            if self.batch.len() == self.params.num_threads {
                self.flush_batch()?;
            }
            Ok(())
        } else {
            let body = self.buffer[self.context_size..self.context_size + self.ptr].to_vec();
            self.emit_block(&body, false)?;
            self.advance_context(&body);
            self.ptr = 0;
            Ok(())
        }
    }

    fn flush_batch(&mut self) -> Result<(), StreamError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let pool = self.job_pool.as_ref().expect("batch only fills with a pool");
        // One shared preceding-context prefix for the whole batch: sub-blocks
        // compress independently and in parallel, so only the batch's own
        // lead-in (not each other's bodies) is visible as history.
        let shared_context = if self.has_history {
            self.buffer[..self.context_size].to_vec()
        } else {
            Vec::new()
        };
        let level = self.params.level;
        let results: Vec<std::sync::Mutex<Option<Vec<u8>>>> =
            self.batch.iter().map(|_| std::sync::Mutex::new(None)).collect();
        let results = std::sync::Arc::new(results);
        let shared_context = std::sync::Arc::new(shared_context);

        pool.prepare_batch(self.batch.len());
        for (i, block) in self.batch.iter().enumerate() {
            let block = block.clone();
            let context = std::sync::Arc::clone(&shared_context);
            let results = std::sync::Arc::clone(&results);
            pool.enqueue(move || {
                let encoded = if context.is_empty() {
                    crate::parser::compress(&block, level)
                } else {
                    crate::parser::compress_with_context(&context, &block, level)
                };
                let out = if encoded.len() >= block.len() {
                    block.clone()
                } else {
                    encoded
                };
                *results[i].lock().unwrap() = Some(out);
            });
        }
        pool.wait();

        let last_block = self.batch.last().cloned();
        for (i, block) in self.batch.drain(..).enumerate() {
            let encoded = results[i].lock().unwrap().take().expect("worker always stores a result");
            let uncompressed = encoded.len() >= block.len();
            if uncompressed {
                self.emit_raw_block(&block, false)?;
            } else {
                self.emit_precompressed_block(&block, &encoded, false)?;
            }
        }
        if let Some(last) = last_block {
            self.advance_context(&last);
        }
        Ok(())
    }

    fn emit_block(&mut self, body: &[u8], partial: bool) -> Result<(), StreamError> {
        let context: Vec<u8> = if self.has_history {
            self.buffer[..self.context_size].to_vec()
        } else {
            Vec::new()
        };
        let encoded = if context.is_empty() {
            block::compress::compress_simple(body, self.params.level)
        } else {
            crate::parser::compress_with_context(&context, body, self.params.level)
        };
        if encoded.len() >= body.len() {
            self.emit_raw_block(body, partial)
        } else {
            self.emit_precompressed_block(body, &encoded, partial)
        }
    }

    fn emit_raw_block(&mut self, body: &[u8], partial: bool) -> Result<(), StreamError> {
        self.write_block_header_and_checksum(body, body.len() as u32, true, partial)?;
        self.writer.write_all(body).map_err(|_| StreamError::Io)?;
        self.fold_incremental(body);
        Ok(())
    }

    fn emit_precompressed_block(
        &mut self,
        raw: &[u8],
        encoded: &[u8],
        partial: bool,
    ) -> Result<(), StreamError> {
        self.write_block_header_and_checksum(raw, encoded.len() as u32, false, partial)?;
        self.writer.write_all(encoded).map_err(|_| StreamError::Io)?;
        self.fold_incremental(raw);
        Ok(())
    }

    fn write_block_header_and_checksum(
        &mut self,
        raw: &[u8],
        wire_len: u32,
        uncompressed: bool,
        partial: bool,
    ) -> Result<(), StreamError> {
        let header = header::pack_block_header(wire_len, uncompressed, partial);
        self.writer
            .write_all(&header.to_le_bytes())
            .map_err(|_| StreamError::Io)?;
        if let Some(f) = &self.params.block_checksum {
            let sum = f(raw);
            self.writer
                .write_all(&sum.to_le_bytes())
                .map_err(|_| StreamError::Io)?;
        }
        if partial {
            self.writer
                .write_all(&(raw.len() as u32).to_le_bytes())
                .map_err(|_| StreamError::Io)?;
        }
        Ok(())
    }

    fn fold_incremental(&mut self, raw: &[u8]) {
        if let Some(f) = &self.params.incremental_checksum {
            self.incremental = f(raw, self.incremental);
        }
    }

    /// Flushes any buffered bytes, writes the end-of-stream marker and the
    /// optional final checksum, and returns the wrapped writer.
    pub fn close(mut self) -> Result<W, StreamError> {
        self.check_alive()?;
        if let Err(e) = self.close_inner() {
            self.errored = true;
            return Err(e);
        }
        Ok(self.writer)
    }

    fn close_inner(&mut self) -> Result<(), StreamError> {
        if self.closed_out {
            return Ok(());
        }
        // Drain any full blocks still sitting in an unfilled MT batch.
        if self.job_pool.is_some() && !self.batch.is_empty() {
            self.flush_batch()?;
        }
        if self.ptr > 0 {
            let body = self.buffer[self.context_size..self.context_size + self.ptr].to_vec();
            self.emit_block(&body, true)?;
            self.ptr = 0;
        }
        self.writer
            .write_all(&header::END_OF_STREAM.to_le_bytes())
            .map_err(|_| StreamError::Io)?;
        if self.params.incremental_checksum.is_some() {
            self.writer
                .write_all(&self.incremental.to_le_bytes())
                .map_err(|_| StreamError::Io)?;
        }
        self.closed_out = true;
        Ok(())
    }
}
