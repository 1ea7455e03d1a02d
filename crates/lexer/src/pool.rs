//! Allocation seam for per-document storage.
//!
//! The lexer never sizes its own buffers from the global allocator; it asks the
//! pool it was created with and hands the storage back on drop.

use std::cell::Cell;

use crate::error::AllocError;

pub trait Pool {
    /// Empty buffer with room for at least `size` bytes.
    fn allocate(&self, size: usize) -> Result<Vec<u8>, AllocError>;

    /// Buffer of exactly `size` zero bytes.
    fn allocate_zeroed(&self, size: usize) -> Result<Vec<u8>, AllocError> {
        let mut buf = self.allocate(size)?;
        buf.resize(size, 0);
        Ok(buf)
    }

    fn release(&self, buf: Vec<u8>);
}

impl<P: Pool + ?Sized> Pool for &P {
    fn allocate(&self, size: usize) -> Result<Vec<u8>, AllocError> {
        (**self).allocate(size)
    }

    fn allocate_zeroed(&self, size: usize) -> Result<Vec<u8>, AllocError> {
        (**self).allocate_zeroed(size)
    }

    fn release(&self, buf: Vec<u8>) {
        (**self).release(buf)
    }
}

/// Plain heap pool; allocation failures are reported instead of aborting.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapPool;

impl Pool for HeapPool {
    fn allocate(&self, size: usize) -> Result<Vec<u8>, AllocError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| AllocError { size })?;
        Ok(buf)
    }

    fn release(&self, buf: Vec<u8>) {
        drop(buf);
    }
}

/// Counts what flows through an inner pool.
///
/// Used to check that a lexer's footprint is bounded by its set-aside size and
/// not by the document size.
#[derive(Debug, Default)]
pub struct TrackingPool<P = HeapPool> {
    inner: P,
    live_bytes: Cell<usize>,
    peak_bytes: Cell<usize>,
    allocations: Cell<u64>,
    limit: Option<usize>,
}

impl<P: Pool> TrackingPool<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            live_bytes: Cell::new(0),
            peak_bytes: Cell::new(0),
            allocations: Cell::new(0),
            limit: None,
        }
    }

    /// Refuse any allocation that would push live bytes past `limit`.
    pub fn with_limit(inner: P, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(inner)
        }
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.get()
    }

    pub fn allocations(&self) -> u64 {
        self.allocations.get()
    }
}

impl<P: Pool> Pool for TrackingPool<P> {
    fn allocate(&self, size: usize) -> Result<Vec<u8>, AllocError> {
        let live = self.live_bytes.get().saturating_add(size);
        if self.limit.is_some_and(|limit| live > limit) {
            return Err(AllocError { size });
        }
        let buf = self.inner.allocate(size)?;
        self.live_bytes.set(live);
        self.peak_bytes.set(self.peak_bytes.get().max(live));
        self.allocations.set(self.allocations.get().saturating_add(1));
        Ok(buf)
    }

    fn release(&self, buf: Vec<u8>) {
        // Buffers handed out by `allocate` are never grown by the lexer.
        let size = buf.capacity();
        self.live_bytes
            .set(self.live_bytes.get().saturating_sub(size));
        self.inner.release(buf);
    }
}
