use super::{LockedRing, QueueConsumer, QueueProducer};
use parking_lot::Mutex;

/// Mutex-protected byte queue with zero-copy region access.
///
/// Same push-region/commit shape as the lock-free ring, but the region is
/// only valid while the lock is held, so it is lent to a closure that
/// returns how many bytes it committed.
#[derive(Debug)]
pub struct RegionQueue {
    ring: Mutex<LockedRing>,
}

impl RegionQueue {
    /// Creates a queue holding up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(LockedRing::new(capacity)),
        }
    }

    /// Returns the capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Returns the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    /// Returns true if no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lends the contiguous free region to `fill` and commits the number of
    /// bytes it returns (clamped to the region length).
    pub fn with_push_region<F>(&self, fill: F) -> usize
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        let mut ring = self.ring.lock();
        let (offset, len) = ring.write_span();
        let n = fill(&mut ring.data[offset..offset + len]).min(len);
        ring.advance_tail(n);
        n
    }

    /// Lends the contiguous buffered region to `drain` and removes the
    /// number of bytes it returns (clamped to the region length).
    pub fn with_pop_region<F>(&self, drain: F) -> usize
    where
        F: FnOnce(&[u8]) -> usize,
    {
        let mut ring = self.ring.lock();
        let (offset, len) = ring.read_span();
        let n = drain(&ring.data[offset..offset + len]).min(len);
        ring.advance_head(n);
        n
    }
}

impl QueueProducer for &RegionQueue {
    fn push(&mut self, bytes: &[u8]) -> usize {
        self.with_push_region(|region| {
            let n = region.len().min(bytes.len());
            region[..n].copy_from_slice(&bytes[..n]);
            n
        })
    }

    fn push_in_place<F: FnOnce(&mut [u8])>(
        &mut self,
        max: usize,
        _scratch: &mut [u8],
        fill: F,
    ) -> usize {
        self.with_push_region(|region| {
            let n = region.len().min(max);
            fill(&mut region[..n]);
            n
        })
    }
}

impl QueueConsumer for &RegionQueue {
    fn pop(&mut self, out: &mut [u8]) -> usize {
        self.with_pop_region(|region| {
            let n = region.len().min(out.len());
            out[..n].copy_from_slice(&region[..n]);
            n
        })
    }

    fn pop_in_place<F: FnOnce(&[u8])>(
        &mut self,
        max: usize,
        _scratch: &mut [u8],
        inspect: F,
    ) -> usize {
        self.with_pop_region(|region| {
            let n = region.len().min(max);
            inspect(&region[..n]);
            n
        })
    }
}
