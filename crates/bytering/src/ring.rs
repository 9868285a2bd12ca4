use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_region_in_bounds,
    debug_assert_within_region,
};
use crate::sync::{AtomicUsize, Ordering, StorageTracker};
use crate::{CommitError, ReadRegion, WriteRegion};
use crossbeam_utils::CachePadded;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::slice;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// ## Unbounded Counters
//
// `head` (bytes ever consumed) and `tail` (bytes ever produced) are stored
// without the modulo. Capacity is a power of two, so it divides 2^usize::BITS
// and all arithmetic on the counters is done with `wrapping_*`:
// - `tail - head == 0` always means empty
// - `tail - head == capacity` always means full
// - the storage offset is `counter & mask`
// This stays correct when the counters wrap past `usize::MAX`.
//
// ## Memory Ordering Protocol
//
// **Producer (push path):**
// 1. Load `head` with Acquire into a private snapshot (synchronizes with the
//    consumer's Release store, so the freed bytes are really free)
// 2. Load `tail` with Relaxed (only the producer writes tail)
// 3. Write bytes into the returned region
// 4. Store `tail` with Release (publishes the writes to the consumer)
//
// **Consumer (pop path):**
// 1. Load `tail` with Acquire into a private snapshot (synchronizes with the
//    producer's Release store, so the published bytes are visible)
// 2. Load `head` with Relaxed (only the consumer writes head)
// 3. Read bytes from the returned region
// 4. Store `head` with Release (publishes consumption to the producer)
//
// ## Single-Writer Invariants
//
// - `tail`: only written by the `Producer` handle
// - `head`: only written by the `Consumer` handle
// - storage in `[tail, head + capacity)`: only written by the producer
// - storage in `[head, tail)`: only read by the consumer
//
// `ByteRing::split` takes `&mut self`, so at most one `Producer` and one
// `Consumer` exist at a time.
//
// =============================================================================

/// State shared by the producer and consumer handles.
struct Shared {
    /// Bytes ever consumed (written by consumer, read by producer)
    head: CachePadded<AtomicUsize>,
    /// Bytes ever produced (written by producer, read by consumer)
    tail: CachePadded<AtomicUsize>,
    /// `capacity - 1`; `usize::MAX` for the zero-capacity ring
    mask: usize,
    /// `log2(capacity)`
    capacity_log2: u32,
    /// Start of the lent storage, valid for `capacity` bytes
    data: NonNull<u8>,
    /// Region accesses as seen by the model checker (no-op outside loom)
    tracker: StorageTracker,
}

// Safety: the storage is only touched through the producer/consumer handles,
// which partition it by the head/tail protocol described above.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn capacity(&self) -> usize {
        self.mask.wrapping_add(1)
    }

    /// Offset and length of the contiguous readable span.
    ///
    /// `cond` is 0 when head and tail are in the same epoch and 1 when tail
    /// has moved into the next one. The `& 1` also folds the case where the
    /// counter has wrapped past `usize::MAX` back to 1. When set, the span is
    /// cut at the end of storage by dropping the `tail & mask` bytes that
    /// already sit at the start of storage.
    #[inline]
    fn pop_span(&self) -> (usize, usize) {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Relaxed);

        let cond = (tail >> self.capacity_log2).wrapping_sub(head >> self.capacity_log2) & 1;
        let len = tail
            .wrapping_sub(head)
            .wrapping_sub((tail & self.mask).wrapping_mul(cond));

        let offset = head & self.mask;
        debug_assert_region_in_bounds!(offset, len, self.capacity());
        (offset, len)
    }

    /// Offset and length of the contiguous writable span.
    ///
    /// Free space is `capacity - (tail - head)`. When head and tail are in the
    /// same epoch (`cond == 0`) the free bytes before `head & mask` belong to
    /// the next lap, so they are cut off.
    #[inline]
    fn push_span(&self) -> (usize, usize) {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);

        let cond = (tail >> self.capacity_log2).wrapping_sub(head >> self.capacity_log2) & 1;
        let len = self
            .capacity()
            .wrapping_sub(tail.wrapping_sub(head))
            .wrapping_sub((head & self.mask).wrapping_mul(1 - cond));

        let offset = tail & self.mask;
        debug_assert_region_in_bounds!(offset, len, self.capacity());
        (offset, len)
    }
}

/// Lock-free single-producer single-consumer byte ring over caller storage.
///
/// The ring borrows its storage for `'a` and never allocates. Only the
/// largest power-of-two prefix of the storage is used. An empty storage slice
/// gives a zero-capacity ring on which every region is empty.
///
/// Use [`split`](Self::split) to obtain the [`Producer`] and [`Consumer`]
/// handles; each can be moved to its own thread.
pub struct ByteRing<'a> {
    shared: Shared,
    _storage: PhantomData<&'a mut [u8]>,
}

impl<'a> ByteRing<'a> {
    /// Creates a ring over `storage`.
    ///
    /// Capacity is the largest power of two `<= storage.len()`; a 10-byte
    /// slice gives capacity 8. An empty slice gives a zero-capacity ring.
    pub fn new(storage: &'a mut [u8]) -> Self {
        // SAFETY: the slice is valid for reads and writes of its full length
        // and stays mutably borrowed for 'a.
        unsafe { Self::from_raw_parts(storage.as_mut_ptr(), storage.len()) }
    }

    /// Creates a ring over `len` bytes starting at `data`.
    ///
    /// A null `data` or a zero `len` gives a zero-capacity ring.
    ///
    /// # Safety
    ///
    /// Unless `data` is null, it must be valid for reads and writes of `len`
    /// bytes for `'a`, and nothing else may access that memory while the ring
    /// is alive.
    pub unsafe fn from_raw_parts(data: *mut u8, len: usize) -> Self {
        match NonNull::new(data) {
            Some(data) if len > 0 => {
                let capacity_log2 = len.ilog2();
                let mask = (1usize << capacity_log2) - 1;
                Self::with_layout(data, mask, capacity_log2)
            }
            _ => Self::invalid(),
        }
    }

    /// Zero-capacity sentinel.
    ///
    /// `mask == usize::MAX` makes `capacity()` wrap to 0, and with both
    /// counters pinned at 0 both span computations yield an empty region at
    /// offset 0 of a dangling (never dereferenced) pointer.
    fn invalid() -> Self {
        Self::with_layout(NonNull::dangling(), usize::MAX, 0)
    }

    fn with_layout(data: NonNull<u8>, mask: usize, capacity_log2: u32) -> Self {
        Self {
            shared: Shared {
                head: CachePadded::new(AtomicUsize::new(0)),
                tail: CachePadded::new(AtomicUsize::new(0)),
                mask,
                capacity_log2,
                data,
                tracker: StorageTracker::new(mask.wrapping_add(1)),
            },
            _storage: PhantomData,
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the usable capacity in bytes (0 for an invalid ring).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns false for the zero-capacity ring built from absent storage.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.capacity() != 0
    }

    /// Returns the number of buffered bytes.
    ///
    /// Exact: the handles borrow the ring, so none are live here.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.shared.head.load(Ordering::Acquire);
        let tail = self.shared.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    /// Returns true if no bytes are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if no byte can be pushed.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Splits the ring into its producer and consumer handles.
    ///
    /// The handles borrow the ring exclusively, so there is never more than
    /// one of each. Dropping them and splitting again resumes where they
    /// left off.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        (
            Producer {
                shared: &self.shared,
                region_len: 0,
            },
            Consumer {
                shared: &self.shared,
                region_len: 0,
            },
        )
    }
}

impl fmt::Debug for ByteRing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRing")
            .field("capacity", &self.capacity())
            .field("head", &self.shared.head.load(Ordering::Relaxed))
            .field("tail", &self.shared.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------
// PRODUCER API
// ---------------------------------------------------------------------

/// Writing half of a [`ByteRing`]. The only handle that advances `tail`.
pub struct Producer<'r> {
    shared: &'r Shared,
    /// Uncommitted bytes left in the last requested region.
    region_len: usize,
}

impl<'r> Producer<'r> {
    /// Returns the ring capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the total number of free bytes, which may span the wrap point.
    #[inline]
    pub fn free(&self) -> usize {
        let head = self.shared.head.load(Ordering::Acquire);
        let tail = self.shared.tail.load(Ordering::Relaxed);
        self.capacity().wrapping_sub(tail.wrapping_sub(head))
    }

    /// Returns the contiguous writable region at the current tail.
    ///
    /// The region never crosses the end of storage, so it may be shorter
    /// than [`free`](Self::free); write, commit, and call again to fill the
    /// part after the wrap. Empty when the ring is full.
    #[inline]
    pub fn push_region(&mut self) -> &mut [u8] {
        let (ptr, len) = self.claim();
        // SAFETY: [tail, tail + len) is free space in storage that only the
        // producer touches until the next commit publishes it, and the slice
        // borrows `self` so it is gone before any commit.
        unsafe { slice::from_raw_parts_mut(ptr, len) }
    }

    /// Same as [`push_region`](Self::push_region) but returns a guard that
    /// commits through the guard itself.
    #[inline]
    pub fn write_region(&mut self) -> WriteRegion<'_, 'r> {
        let (ptr, len) = self.claim();
        WriteRegion::new(self, ptr, len)
    }

    #[inline]
    fn claim(&mut self) -> (*mut u8, usize) {
        let (offset, len) = self.shared.push_span();
        self.region_len = len;
        self.shared.tracker.write(offset, len);
        // SAFETY: offset < capacity (or 0 for the empty ring), inside storage.
        (unsafe { self.shared.data.as_ptr().add(offset) }, len)
    }

    /// Publishes `count` bytes written into the last region.
    ///
    /// Fails without touching the ring if `count` exceeds what is left of the
    /// last region returned by [`push_region`](Self::push_region).
    pub fn commit_push(&mut self, count: usize) -> Result<(), CommitError> {
        if count > self.region_len {
            return Err(CommitError {
                attempted: count,
                available: self.region_len,
            });
        }
        // SAFETY: we just verified count <= region_len
        unsafe { self.commit_push_unchecked(count) };
        Ok(())
    }

    /// Publishes `count` bytes without checking them against the last region.
    ///
    /// # Safety
    ///
    /// `count` must not exceed the uncommitted length of the last region
    /// returned by [`push_region`](Self::push_region). Violations are caught
    /// by debug assertions only.
    #[inline]
    pub unsafe fn commit_push_unchecked(&mut self, count: usize) {
        debug_assert_within_region!("push", count, self.region_len);
        self.region_len = self.region_len.wrapping_sub(count);

        let tail = self.shared.tail.load(Ordering::Relaxed);
        let new_tail = tail.wrapping_add(count);

        #[cfg(debug_assertions)]
        {
            let head = self.shared.head.load(Ordering::Relaxed);
            debug_assert_bounded_count!(new_tail.wrapping_sub(head), self.capacity());
        }

        self.shared.tail.store(new_tail, Ordering::Release);
    }

    /// Copies as much of `bytes` as fits, crossing the wrap point if needed.
    ///
    /// Returns the number of bytes written; 0 when the ring is full.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        while written < bytes.len() {
            let region = self.push_region();
            let n = region.len().min(bytes.len() - written);
            if n == 0 {
                break;
            }
            region[..n].copy_from_slice(&bytes[written..written + n]);
            // SAFETY: n <= the region length just returned
            unsafe { self.commit_push_unchecked(n) };
            written += n;
        }
        written
    }
}

impl fmt::Debug for Producer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("region_len", &self.region_len)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------
// CONSUMER API
// ---------------------------------------------------------------------

/// Reading half of a [`ByteRing`]. The only handle that advances `head`.
pub struct Consumer<'r> {
    shared: &'r Shared,
    /// Unconsumed bytes left in the last requested region.
    region_len: usize,
}

impl<'r> Consumer<'r> {
    /// Returns the ring capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the total number of readable bytes, which may span the wrap
    /// point.
    #[inline]
    pub fn available(&self) -> usize {
        let tail = self.shared.tail.load(Ordering::Acquire);
        let head = self.shared.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head)
    }

    /// Returns the contiguous readable region at the current head.
    ///
    /// The region never crosses the end of storage, so it may be shorter
    /// than [`available`](Self::available); consume and call again to read
    /// past the wrap. Empty when the ring is empty.
    #[inline]
    pub fn pop_region(&mut self) -> &[u8] {
        let (ptr, len) = self.claim();
        // SAFETY: [head, head + len) was published by the producer's Release
        // store of tail, observed by the Acquire load in pop_span. The
        // producer will not write there until head moves past it.
        unsafe { slice::from_raw_parts(ptr, len) }
    }

    /// Same as [`pop_region`](Self::pop_region) but returns a guard that
    /// consumes through the guard itself.
    #[inline]
    pub fn read_region(&mut self) -> ReadRegion<'_, 'r> {
        let (ptr, len) = self.claim();
        ReadRegion::new(self, ptr, len)
    }

    #[inline]
    fn claim(&mut self) -> (*const u8, usize) {
        let (offset, len) = self.shared.pop_span();
        self.region_len = len;
        self.shared.tracker.read(offset, len);
        // SAFETY: offset < capacity (or 0 for the empty ring), inside storage.
        (unsafe { self.shared.data.as_ptr().add(offset) }, len)
    }

    /// Releases `count` bytes of the last region back to the producer.
    ///
    /// Fails without touching the ring if `count` exceeds what is left of the
    /// last region returned by [`pop_region`](Self::pop_region).
    pub fn commit_pop(&mut self, count: usize) -> Result<(), CommitError> {
        if count > self.region_len {
            return Err(CommitError {
                attempted: count,
                available: self.region_len,
            });
        }
        // SAFETY: we just verified count <= region_len
        unsafe { self.commit_pop_unchecked(count) };
        Ok(())
    }

    /// Releases `count` bytes without checking them against the last region.
    ///
    /// # Safety
    ///
    /// `count` must not exceed the unconsumed length of the last region
    /// returned by [`pop_region`](Self::pop_region). Violations are caught by
    /// debug assertions only.
    #[inline]
    pub unsafe fn commit_pop_unchecked(&mut self, count: usize) {
        debug_assert_within_region!("pop", count, self.region_len);
        self.region_len = self.region_len.wrapping_sub(count);

        let head = self.shared.head.load(Ordering::Relaxed);
        let new_head = head.wrapping_add(count);

        #[cfg(debug_assertions)]
        {
            let tail = self.shared.tail.load(Ordering::Relaxed);
            debug_assert_head_not_past_tail!(head, new_head, tail);
        }

        self.shared.head.store(new_head, Ordering::Release);
    }

    /// Copies up to `out.len()` bytes out of the ring, crossing the wrap
    /// point if needed.
    ///
    /// Returns the number of bytes read; 0 when the ring is empty.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let mut read = 0;
        while read < out.len() {
            let region = self.pop_region();
            let n = region.len().min(out.len() - read);
            if n == 0 {
                break;
            }
            out[read..read + n].copy_from_slice(&region[..n]);
            // SAFETY: n <= the region length just returned
            unsafe { self.commit_pop_unchecked(n) };
            read += n;
        }
        read
    }
}

impl fmt::Debug for Consumer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("region_len", &self.region_len)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    /// Builds a ring whose counters start at `start`, to exercise wrap-around
    /// of the counter space without pushing 2^64 bytes.
    fn ring_at(storage: &mut [u8], start: usize) -> ByteRing<'_> {
        let ring = ByteRing::new(storage);
        ring.shared.head.store(start, Ordering::Relaxed);
        ring.shared.tail.store(start, Ordering::Relaxed);
        ring
    }

    #[test]
    fn test_capacity_is_largest_power_of_two() {
        for (len, expected) in [(1, 1), (2, 2), (3, 2), (10, 8), (16, 16), (17, 16), (1000, 512)] {
            let mut storage = vec![0u8; len];
            let ring = ByteRing::new(&mut storage);
            assert_eq!(ring.capacity(), expected, "len {}", len);
            assert!(ring.is_valid());
        }
    }

    #[test]
    fn test_empty_storage_gives_invalid_ring() {
        let mut ring = ByteRing::new(&mut []);
        assert_eq!(ring.capacity(), 0);
        assert!(!ring.is_valid());

        let (mut producer, mut consumer) = ring.split();
        assert!(producer.push_region().is_empty());
        assert!(consumer.pop_region().is_empty());
        assert_eq!(producer.write(b"abc"), 0);
        assert_eq!(consumer.read(&mut [0u8; 3]), 0);
        assert_eq!(
            producer.commit_push(1),
            Err(CommitError {
                attempted: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_null_pointer_gives_invalid_ring() {
        // SAFETY: a null pointer is explicitly allowed
        let ring = unsafe { ByteRing::from_raw_parts(std::ptr::null_mut(), 64) };
        assert_eq!(ring.capacity(), 0);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_sequential_fill_and_drain() {
        let mut storage = [0u8; 16];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        let region = producer.push_region();
        assert_eq!(region.len(), 16);
        for (i, b) in region.iter_mut().enumerate() {
            *b = i as u8;
        }
        producer.commit_push(16).unwrap();

        assert!(producer.push_region().is_empty());

        let region = consumer.pop_region();
        assert_eq!(region.len(), 16);
        assert!(region.iter().enumerate().all(|(i, b)| *b == i as u8));
        consumer.commit_pop(16).unwrap();

        assert!(consumer.pop_region().is_empty());
        assert_eq!(producer.push_region().len(), 16);
    }

    #[test]
    fn test_regions_stop_at_storage_end() {
        let mut storage = [0u8; 8];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        assert_eq!(producer.write(&[1, 2, 3, 4, 5, 6]), 6);
        assert_eq!(consumer.read(&mut [0u8; 5]), 5);

        // head = 5, tail = 6: free space is [6, 8) then [0, 5)
        assert_eq!(producer.push_region().len(), 2);
        producer.commit_push(2).unwrap();
        assert_eq!(producer.push_region().len(), 5);
        producer.commit_push(5).unwrap();
        assert!(producer.push_region().is_empty());

        // head = 5, tail = 13: readable is [5, 8) then [0, 5)
        assert_eq!(consumer.available(), 8);
        assert_eq!(consumer.pop_region().len(), 3);
        consumer.commit_pop(3).unwrap();
        assert_eq!(consumer.pop_region().len(), 5);
    }

    #[test]
    fn test_commit_rejects_more_than_region() {
        let mut storage = [0u8; 8];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        assert_eq!(producer.push_region().len(), 8);
        producer.commit_push(3).unwrap();
        // Only 5 bytes of the last region are left uncommitted
        assert_eq!(
            producer.commit_push(6),
            Err(CommitError {
                attempted: 6,
                available: 5
            })
        );
        producer.commit_push(5).unwrap();

        // No region requested yet on the consumer side
        assert!(consumer.commit_pop(1).is_err());
        assert_eq!(consumer.pop_region().len(), 8);
        assert!(consumer.commit_pop(9).is_err());
        assert_eq!(consumer.available(), 8);
    }

    #[test]
    fn test_counter_wrap_around() {
        let mut storage = [0u8; 8];
        let mut ring = ring_at(&mut storage, usize::MAX - 2);
        let (mut producer, mut consumer) = ring.split();

        // Offset of usize::MAX - 2 is 5, so the first region is 3 bytes
        assert_eq!(producer.push_region().len(), 3);
        assert_eq!(producer.write(b"abcdefgh"), 8);
        assert!(producer.push_region().is_empty());
        assert_eq!(consumer.available(), 8);

        let mut out = [0u8; 8];
        assert_eq!(consumer.read(&mut out), 8);
        assert_eq!(&out, b"abcdefgh");
        assert!(consumer.pop_region().is_empty());
        assert_eq!(producer.push_region().len(), 3);
    }

    #[test]
    fn test_capacity_one() {
        let mut storage = [0u8; 1];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        for i in 0..10u8 {
            assert_eq!(producer.write(&[i, i]), 1);
            assert!(producer.push_region().is_empty());
            let mut out = [0u8; 2];
            assert_eq!(consumer.read(&mut out), 1);
            assert_eq!(out[0], i);
        }
    }

    #[test]
    fn test_split_again_resumes() {
        let mut storage = [0u8; 4];
        let mut ring = ByteRing::new(&mut storage);
        {
            let (mut producer, _) = ring.split();
            assert_eq!(producer.write(b"xy"), 2);
        }
        assert_eq!(ring.len(), 2);

        let (_, mut consumer) = ring.split();
        let mut out = [0u8; 4];
        assert_eq!(consumer.read(&mut out), 2);
        assert_eq!(&out[..2], b"xy");
    }
}
