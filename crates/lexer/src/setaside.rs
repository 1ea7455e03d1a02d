//! Bounded carry buffer for a token that straddles `scan` calls.

use crate::error::AllocError;
use crate::pool::Pool;

#[derive(Debug)]
pub(crate) struct SetAside {
    /// Allocated from the pool on first use, sized to `max`.
    buf: Option<Vec<u8>>,
    max: usize,
    /// Limit set while bytes were held; applied once the buffer empties.
    next_max: Option<usize>,
    /// Document offset of `buf[0]`; meaningful only while non-empty.
    offset: u64,
    /// The pending token already overflowed; the rest of it is flushed as
    /// misc as it arrives.
    degraded: bool,
}

impl SetAside {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            buf: None,
            max,
            next_max: None,
            offset: 0,
            degraded: false,
        }
    }

    /// The configured limit, including one not yet in effect.
    pub(crate) fn max(&self) -> usize {
        self.next_max.unwrap_or(self.max)
    }

    /// The limit the held bytes are checked against.
    pub(crate) fn limit(&self) -> usize {
        if self.is_empty() { self.max() } else { self.max }
    }

    /// Change the limit. An empty buffer sized for the old limit goes back to
    /// the pool so the next allocation uses the new size. While bytes are
    /// held the old limit stays until they are released.
    pub(crate) fn set_max(&mut self, max: usize, pool: &dyn Pool) {
        if self.is_empty() {
            self.apply_max(max, pool);
        } else {
            self.next_max = Some(max);
        }
    }

    fn apply_max(&mut self, max: usize, pool: &dyn Pool) {
        if let Some(buf) = self.buf.take() {
            pool.release(buf);
        }
        self.max = max;
        self.next_max = None;
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.as_ref().map_or(0, Vec::len)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn fits(&self, extra: usize) -> bool {
        self.len().saturating_add(extra) <= self.limit()
    }

    /// Append bytes that start at document offset `offset`. Callers check
    /// [`SetAside::fits`] first.
    pub(crate) fn store(
        &mut self,
        pool: &dyn Pool,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), AllocError> {
        debug_assert!(self.fits(bytes.len()));
        if self.is_empty()
            && let Some(max) = self.next_max
        {
            self.apply_max(max, pool);
        }
        let buf = match &mut self.buf {
            Some(buf) => buf,
            slot @ None => slot.insert(pool.allocate(self.max)?),
        };
        if buf.is_empty() {
            self.offset = offset;
        }
        buf.extend_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        if let Some(buf) = &mut self.buf {
            buf.clear();
        }
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub(crate) fn set_degraded(&mut self) {
        self.degraded = true;
    }

    pub(crate) fn take_degraded(&mut self) -> bool {
        std::mem::take(&mut self.degraded)
    }

    pub(crate) fn take_buffer(&mut self) -> Option<Vec<u8>> {
        self.buf.take()
    }
}

#[cfg(test)]
mod tests {
    use super::SetAside;
    use crate::pool::{HeapPool, TrackingPool};

    #[test]
    fn storage_is_allocated_lazily_at_max_size() {
        let pool = TrackingPool::new(HeapPool);
        let mut setaside = SetAside::new(16);
        assert_eq!(pool.allocations(), 0);
        setaside.store(&pool, 40, b"abc").unwrap();
        setaside.store(&pool, 43, b"de").unwrap();
        assert_eq!(pool.allocations(), 1);
        assert_eq!(pool.live_bytes(), 16);
        assert_eq!(setaside.bytes(), b"abcde");
        assert_eq!(setaside.offset(), 40);
    }

    #[test]
    fn fits_respects_current_length() {
        let mut setaside = SetAside::new(4);
        assert!(setaside.fits(4));
        assert!(!setaside.fits(5));
        setaside.store(&HeapPool, 0, b"ab").unwrap();
        assert!(setaside.fits(2));
        assert!(!setaside.fits(3));
        setaside.clear();
        assert!(setaside.is_empty());
        assert!(setaside.fits(4));
    }

    #[test]
    fn resizing_an_empty_buffer_returns_it_to_the_pool() {
        let pool = TrackingPool::new(HeapPool);
        let mut setaside = SetAside::new(8);
        setaside.store(&pool, 0, b"x").unwrap();
        setaside.clear();
        setaside.set_max(32, &pool);
        assert_eq!(pool.live_bytes(), 0);
        setaside.store(&pool, 5, b"y").unwrap();
        assert_eq!(pool.live_bytes(), 32);
        assert_eq!(setaside.max(), 32);
    }

    #[test]
    fn resizing_while_holding_bytes_waits_for_release() {
        let pool = TrackingPool::new(HeapPool);
        let mut setaside = SetAside::new(8);
        setaside.store(&pool, 0, b"abcdef").unwrap();
        setaside.set_max(4, &pool);
        assert_eq!(setaside.limit(), 8);
        assert!(setaside.fits(2));
        assert!(!setaside.fits(3));
        setaside.store(&pool, 6, b"gh").unwrap();
        assert!(setaside.len() <= setaside.limit());
        assert_eq!(pool.live_bytes(), 8);

        setaside.clear();
        assert_eq!(setaside.limit(), 4);
        assert!(!setaside.fits(5));
        setaside.store(&pool, 20, b"wxyz").unwrap();
        assert_eq!(pool.allocations(), 2);
        assert_eq!(pool.live_bytes(), 4);
        assert_eq!(setaside.max(), 4);
    }

    #[test]
    fn growing_while_holding_bytes_keeps_the_allocation() {
        let pool = TrackingPool::new(HeapPool);
        let mut setaside = SetAside::new(4);
        setaside.store(&pool, 0, b"ab").unwrap();
        setaside.set_max(64, &pool);
        assert_eq!(setaside.max(), 64);
        assert!(!setaside.fits(3));
        assert_eq!(pool.live_bytes(), 4);
    }
}
