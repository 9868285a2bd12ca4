//! Comparison queues and the producer/consumer traits the stress harness
//! drives them through.
//!
//! All three baselines keep a plain `{ head, len }` ring behind a
//! `parking_lot::Mutex` and differ only in how much work each lock
//! acquisition covers:
//!
//! - [`ByteQueue`]: one byte per lock
//! - [`VectorQueue`]: one whole slice copy per lock
//! - [`RegionQueue`]: one contiguous region handed to a closure per lock
//!
//! [`LockFreeDivQueue`] is the lock-free counterpart for storage of any
//! length, paying a division per region instead of a mask.
//!
//! The lock-free [`bytering::Producer`] / [`bytering::Consumer`] implement the
//! same traits so the harness treats every queue alike.

mod byte_queue;
mod lock_free_div_queue;
mod region_queue;
mod vector_queue;

pub use byte_queue::ByteQueue;
pub use lock_free_div_queue::{DivConsumer, DivProducer, LockFreeDivQueue};
pub use region_queue::RegionQueue;
pub use vector_queue::VectorQueue;

/// Writing side of a byte queue.
pub trait QueueProducer {
    /// Copies as much of `bytes` as fits; returns the number accepted.
    fn push(&mut self, bytes: &[u8]) -> usize;

    /// Lets `fill` write up to `max` bytes, then publishes them.
    ///
    /// Queues with region access hand `fill` their own storage; the default
    /// fills `scratch` and pushes it, dropping whatever does not fit. `fill`
    /// must not assume the slice length is `max`.
    fn push_in_place<F: FnOnce(&mut [u8])>(
        &mut self,
        max: usize,
        scratch: &mut [u8],
        fill: F,
    ) -> usize {
        let scratch_len = scratch.len();
        let buf = &mut scratch[..max.min(scratch_len)];
        fill(&mut *buf);
        self.push(buf)
    }
}

/// Reading side of a byte queue.
pub trait QueueConsumer {
    /// Copies up to `out.len()` bytes out; returns the number removed.
    fn pop(&mut self, out: &mut [u8]) -> usize;

    /// Shows up to `max` buffered bytes to `inspect`, then removes them.
    ///
    /// Queues with region access show their own storage; the default pops
    /// into `scratch` first.
    fn pop_in_place<F: FnOnce(&[u8])>(
        &mut self,
        max: usize,
        scratch: &mut [u8],
        inspect: F,
    ) -> usize {
        let max = max.min(scratch.len());
        let n = self.pop(&mut scratch[..max]);
        inspect(&scratch[..n]);
        n
    }
}

impl QueueProducer for bytering::Producer<'_> {
    #[inline]
    fn push(&mut self, bytes: &[u8]) -> usize {
        self.write(bytes)
    }

    #[inline]
    fn push_in_place<F: FnOnce(&mut [u8])>(
        &mut self,
        max: usize,
        _scratch: &mut [u8],
        fill: F,
    ) -> usize {
        let region = self.push_region();
        let n = region.len().min(max);
        if n == 0 {
            return 0;
        }
        fill(&mut region[..n]);
        // SAFETY: n <= the region length just returned
        unsafe { self.commit_push_unchecked(n) };
        n
    }
}

impl QueueConsumer for bytering::Consumer<'_> {
    #[inline]
    fn pop(&mut self, out: &mut [u8]) -> usize {
        self.read(out)
    }

    #[inline]
    fn pop_in_place<F: FnOnce(&[u8])>(
        &mut self,
        max: usize,
        _scratch: &mut [u8],
        inspect: F,
    ) -> usize {
        let region = self.pop_region();
        let n = region.len().min(max);
        if n == 0 {
            return 0;
        }
        inspect(&region[..n]);
        // SAFETY: n <= the region length just returned
        unsafe { self.commit_pop_unchecked(n) };
        n
    }
}

/// Ring state shared by the lock-based queues; always accessed under a lock.
///
/// Capacity is the storage length as given (no power-of-two rounding), so
/// indices wrap by comparison and an explicit element count tells empty from
/// full.
#[derive(Debug)]
struct LockedRing {
    data: Box<[u8]>,
    head: usize,
    len: usize,
}

impl LockedRing {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Maps `index < 2 * capacity` into storage.
    #[inline]
    fn wrap(&self, index: usize) -> usize {
        if index >= self.capacity() {
            index - self.capacity()
        } else {
            index
        }
    }

    #[inline]
    fn tail(&self) -> usize {
        self.wrap(self.head + self.len)
    }

    fn push_byte(&mut self, byte: u8) -> bool {
        if self.len == self.capacity() {
            return false;
        }
        let tail = self.tail();
        self.data[tail] = byte;
        self.len += 1;
        true
    }

    fn pop_byte(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.data[self.head];
        self.head = self.wrap(self.head + 1);
        self.len -= 1;
        Some(byte)
    }

    /// Contiguous free span at the tail: (offset, len).
    #[inline]
    fn write_span(&self) -> (usize, usize) {
        let tail = self.tail();
        (tail, self.free().min(self.capacity() - tail))
    }

    /// Contiguous buffered span at the head: (offset, len).
    #[inline]
    fn read_span(&self) -> (usize, usize) {
        (self.head, self.len.min(self.capacity() - self.head))
    }

    #[inline]
    fn advance_tail(&mut self, n: usize) {
        debug_assert!(n <= self.free());
        self.len += n;
    }

    #[inline]
    fn advance_head(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.head = self.wrap(self.head + n);
        self.len -= n;
    }
}
