use super::{QueueConsumer, QueueProducer};
use bytering::CommitError;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free SPSC byte queue over storage of any length.
///
/// Same unbounded `head`/`tail` counters as [`bytering::ByteRing`], but the
/// capacity is not rounded to a power of two, so epochs and offsets come from
/// `/` and `%` and the region length takes a branch. Counters are assumed
/// never to reach `usize::MAX`; past that point the epoch of a non-power-of-two
/// size is no longer consistent.
///
/// The counter written by the other side is always loaded with `Acquire`.
pub struct LockFreeDivQueue {
    /// Bytes ever consumed
    head: CachePadded<AtomicUsize>,
    /// Bytes ever produced
    tail: CachePadded<AtomicUsize>,
    data: Box<[UnsafeCell<u8>]>,
}

// SAFETY: storage bytes are only touched through the single producer and
// consumer handles, partitioned by head/tail with release/acquire.
unsafe impl Sync for LockFreeDivQueue {}

impl LockFreeDivQueue {
    /// Creates a queue holding exactly `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            data: (0..capacity).map(|_| UnsafeCell::new(0)).collect(),
        }
    }

    /// Returns the capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of buffered bytes.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail - head
    }

    /// Returns true if no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the queue into its producer and consumer handles.
    pub fn split(&mut self) -> (DivProducer<'_>, DivConsumer<'_>) {
        let queue: &Self = self;
        (
            DivProducer {
                queue,
                region_len: 0,
            },
            DivConsumer {
                queue,
                region_len: 0,
            },
        )
    }

    #[inline]
    fn ptr_at(&self, offset: usize) -> *mut u8 {
        UnsafeCell::raw_get(self.data.as_ptr()).wrapping_add(offset)
    }

    /// Offset and length of the contiguous free span at the tail.
    fn push_span(&self) -> (usize, usize) {
        let size = self.capacity();
        if size == 0 {
            return (0, 0);
        }
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);

        let offset = tail % size;
        let len = if head / size == tail / size {
            size - offset
        } else {
            size - (tail - head)
        };
        (offset, len)
    }

    /// Offset and length of the contiguous buffered span at the head.
    fn pop_span(&self) -> (usize, usize) {
        let size = self.capacity();
        if size == 0 {
            return (0, 0);
        }
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Relaxed);

        let offset = head % size;
        let len = if head / size == tail / size {
            tail - head
        } else {
            tail - head - tail % size
        };
        (offset, len)
    }
}

impl std::fmt::Debug for LockFreeDivQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockFreeDivQueue")
            .field("capacity", &self.capacity())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Writing half of a [`LockFreeDivQueue`].
#[derive(Debug)]
pub struct DivProducer<'q> {
    queue: &'q LockFreeDivQueue,
    region_len: usize,
}

impl DivProducer<'_> {
    /// Returns the contiguous writable region at the tail.
    pub fn push_region(&mut self) -> &mut [u8] {
        let (offset, len) = self.queue.push_span();
        self.region_len = len;
        // SAFETY: [tail, tail + len) is free space only the producer writes
        // until commit_push publishes it; the slice borrows self.
        unsafe { slice::from_raw_parts_mut(self.queue.ptr_at(offset), len) }
    }

    /// Publishes `count` bytes of the last region.
    pub fn commit_push(&mut self, count: usize) -> Result<(), CommitError> {
        if count > self.region_len {
            return Err(CommitError {
                attempted: count,
                available: self.region_len,
            });
        }
        self.region_len -= count;
        let tail = self.queue.tail.load(Ordering::Relaxed);
        self.queue.tail.store(tail + count, Ordering::Release);
        Ok(())
    }
}

/// Reading half of a [`LockFreeDivQueue`].
#[derive(Debug)]
pub struct DivConsumer<'q> {
    queue: &'q LockFreeDivQueue,
    region_len: usize,
}

impl DivConsumer<'_> {
    /// Returns the contiguous readable region at the head.
    pub fn pop_region(&mut self) -> &[u8] {
        let (offset, len) = self.queue.pop_span();
        self.region_len = len;
        // SAFETY: [head, head + len) was published by the producer's Release
        // store observed in pop_span; the producer does not write it until
        // head moves past it.
        unsafe { slice::from_raw_parts(self.queue.ptr_at(offset), len) }
    }

    /// Releases `count` bytes of the last region.
    pub fn commit_pop(&mut self, count: usize) -> Result<(), CommitError> {
        if count > self.region_len {
            return Err(CommitError {
                attempted: count,
                available: self.region_len,
            });
        }
        self.region_len -= count;
        let head = self.queue.head.load(Ordering::Relaxed);
        self.queue.head.store(head + count, Ordering::Release);
        Ok(())
    }
}

impl QueueProducer for DivProducer<'_> {
    fn push(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        while written < bytes.len() {
            let region = self.push_region();
            let n = region.len().min(bytes.len() - written);
            if n == 0 {
                break;
            }
            region[..n].copy_from_slice(&bytes[written..written + n]);
            if self.commit_push(n).is_err() {
                break;
            }
            written += n;
        }
        written
    }

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
        self.commit_push(n).map_or(0, |()| n)
    }
}

impl QueueConsumer for DivConsumer<'_> {
    fn pop(&mut self, out: &mut [u8]) -> usize {
        let mut read = 0;
        while read < out.len() {
            let region = self.pop_region();
            let n = region.len().min(out.len() - read);
            if n == 0 {
                break;
            }
            out[read..read + n].copy_from_slice(&region[..n]);
            if self.commit_pop(n).is_err() {
                break;
            }
            read += n;
        }
        read
    }

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
        self.commit_pop(n).map_or(0, |()| n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_power_of_two_regions() {
        let mut queue = LockFreeDivQueue::new(6);
        let (mut producer, mut consumer) = queue.split();

        assert_eq!(producer.push_region().len(), 6);
        producer.commit_push(4).unwrap();
        assert_eq!(consumer.pop_region().len(), 4);
        consumer.commit_pop(3).unwrap();

        // head = 3, tail = 4: same epoch, free up to the end of storage
        assert_eq!(producer.push_region().len(), 2);
        producer.commit_push(2).unwrap();
        // tail = 6 is the next epoch: free space [0, 3)
        assert_eq!(producer.push_region().len(), 3);
        producer.commit_push(3).unwrap();
        assert!(producer.push_region().is_empty());

        // head = 3, tail = 9: readable [3, 6) before the wrap
        assert_eq!(consumer.pop_region().len(), 3);
        consumer.commit_pop(3).unwrap();
        assert_eq!(consumer.pop_region().len(), 3);
    }

    #[test]
    fn test_fifo_across_many_wraps() {
        let mut queue = LockFreeDivQueue::new(5);
        let (mut producer, mut consumer) = queue.split();
        let mut next_in = 0u8;
        let mut next_out = 0u8;

        for _ in 0..50 {
            let bytes: Vec<u8> = (0..4).map(|i| next_in.wrapping_add(i)).collect();
            let n = producer.push(&bytes);
            next_in = next_in.wrapping_add(n as u8);

            let mut out = [0u8; 3];
            let n = consumer.pop(&mut out);
            for &b in &out[..n] {
                assert_eq!(b, next_out);
                next_out = next_out.wrapping_add(1);
            }
        }
    }

    #[test]
    fn test_overcommit_rejected() {
        let mut queue = LockFreeDivQueue::new(3);
        let (mut producer, mut consumer) = queue.split();
        assert_eq!(producer.push_region().len(), 3);
        assert_eq!(
            producer.commit_push(4),
            Err(CommitError {
                attempted: 4,
                available: 3
            })
        );
        assert!(consumer.commit_pop(1).is_err());
    }

    #[test]
    fn test_zero_capacity() {
        let mut queue = LockFreeDivQueue::new(0);
        let (mut producer, mut consumer) = queue.split();
        assert!(producer.push_region().is_empty());
        assert!(consumer.pop_region().is_empty());
        assert_eq!(producer.push(b"x"), 0);
    }
}
