use super::{LockedRing, QueueConsumer, QueueProducer};
use parking_lot::Mutex;

/// Mutex-protected byte queue that copies a whole slice per lock acquisition.
///
/// Each call moves as much as fits with at most two `memcpy`s, one on each
/// side of the wrap point.
#[derive(Debug)]
pub struct VectorQueue {
    ring: Mutex<LockedRing>,
}

impl VectorQueue {
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

    /// Appends as much of `bytes` as fits; returns the number appended.
    pub fn push_slice(&self, bytes: &[u8]) -> usize {
        let mut ring = self.ring.lock();
        let n = bytes.len().min(ring.free());
        let tail = ring.tail();
        let first = n.min(ring.capacity() - tail);

        ring.data[tail..tail + first].copy_from_slice(&bytes[..first]);
        ring.data[..n - first].copy_from_slice(&bytes[first..n]);
        ring.advance_tail(n);
        n
    }

    /// Removes up to `out.len()` bytes into `out`; returns the number removed.
    pub fn pop_slice(&self, out: &mut [u8]) -> usize {
        let mut ring = self.ring.lock();
        let n = out.len().min(ring.len);
        let head = ring.head;
        let first = n.min(ring.capacity() - head);

        out[..first].copy_from_slice(&ring.data[head..head + first]);
        out[first..n].copy_from_slice(&ring.data[..n - first]);
        ring.advance_head(n);
        n
    }
}

impl QueueProducer for &VectorQueue {
    #[inline]
    fn push(&mut self, bytes: &[u8]) -> usize {
        self.push_slice(bytes)
    }
}

impl QueueConsumer for &VectorQueue {
    #[inline]
    fn pop(&mut self, out: &mut [u8]) -> usize {
        self.pop_slice(out)
    }
}
