//! Reusable scratch buffers for the tile hot path.
//!
//! Borrowing scans the free list linearly for the first buffer that is at
//! least as large as requested. This is first-fit, not best-fit: a large
//! buffer may serve a small request. Buffers are never shrunk.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Thread-safe free list of byte buffers keyed by minimum size.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a buffer of at least `min_len` bytes out of the pool, allocating a
    /// zeroed one if none is large enough.
    ///
    /// The returned buffer may be longer than requested and may contain data
    /// from a previous use.
    pub fn take(&self, min_len: usize) -> Vec<u8> {
        let mut free = self.free.lock();
        match free.iter().position(|buffer| buffer.len() >= min_len) {
            Some(position) => free.swap_remove(position),
            None => vec![0u8; min_len],
        }
    }

    /// Return a buffer to the pool.
    pub fn put_back(&self, buffer: Vec<u8>) {
        self.free.lock().push(buffer);
    }

    /// Borrow a buffer that returns itself to the pool when dropped.
    ///
    /// The guard derefs to exactly `min_len` bytes.
    pub fn borrow(&self, min_len: usize) -> PooledBuffer<'_> {
        PooledBuffer {
            pool: self,
            buffer: self.take(min_len),
            len: min_len,
        }
    }

    /// Number of idle buffers.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}

/// A buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: Vec<u8>,
    len: usize,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[..self.len]
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put_back(std::mem::take(&mut self.buffer));
    }
}
