use crate::{CommitError, Consumer, Producer};
use std::slice;

/// Zero-copy write access to the contiguous free region of a ring.
///
/// Obtained from [`Producer::write_region`]. Write into
/// [`as_mut_slice`](Self::as_mut_slice), then commit to make the bytes
/// visible to the consumer. Dropping the guard without committing publishes
/// nothing.
///
/// **Important:** the region stops at the end of the storage, so it may be
/// shorter than the total free space. Request another region after
/// committing to write past the wrap point.
///
/// # Example
///
/// ```
/// use bytering::ByteRing;
///
/// let mut storage = [0u8; 8];
/// let mut ring = ByteRing::new(&mut storage);
/// let (mut producer, _consumer) = ring.split();
///
/// let mut region = producer.write_region();
/// let n = region.len().min(3);
/// region.as_mut_slice()[..n].copy_from_slice(&b"abc"[..n]);
/// region.try_commit_n(n).unwrap();
/// ```
pub struct WriteRegion<'p, 'r> {
    producer: &'p mut Producer<'r>,
    ptr: *mut u8,
    len: usize,
}

impl<'p, 'r> WriteRegion<'p, 'r> {
    pub(crate) fn new(producer: &'p mut Producer<'r>, ptr: *mut u8, len: usize) -> Self {
        Self { producer, ptr, len }
    }

    /// Returns the writable bytes.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr/len describe free storage owned by the producer until
        // commit, and the guard holds the producer exclusively.
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Returns the region length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the ring had no contiguous free space.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Commits the whole region.
    pub fn commit(self) {
        let len = self.len;
        // SAFETY: len is the region length
        unsafe { self.producer.commit_push_unchecked(len) };
    }

    /// Commits exactly `n` bytes (where `n <= len()`).
    pub fn try_commit_n(self, n: usize) -> Result<(), CommitError> {
        if n > self.len {
            return Err(CommitError {
                attempted: n,
                available: self.len,
            });
        }
        // SAFETY: We just verified n <= self.len
        unsafe { self.producer.commit_push_unchecked(n) };
        Ok(())
    }

    /// Commits `n` bytes, saturating at `len()`.
    ///
    /// Returns the number of bytes actually committed.
    pub fn commit_up_to(self, n: usize) -> usize {
        let to_commit = n.min(self.len);
        // SAFETY: to_commit <= self.len by construction
        unsafe { self.producer.commit_push_unchecked(to_commit) };
        to_commit
    }
}

/// Zero-copy read access to the contiguous readable region of a ring.
///
/// Obtained from [`Consumer::read_region`]. Inspect
/// [`as_slice`](Self::as_slice), then consume to hand the bytes back to the
/// producer. Dropping the guard without consuming keeps the bytes buffered.
pub struct ReadRegion<'c, 'r> {
    consumer: &'c mut Consumer<'r>,
    ptr: *const u8,
    len: usize,
}

impl<'c, 'r> ReadRegion<'c, 'r> {
    pub(crate) fn new(consumer: &'c mut Consumer<'r>, ptr: *const u8, len: usize) -> Self {
        Self { consumer, ptr, len }
    }

    /// Returns the readable bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr/len describe published storage that the producer will
        // not touch until head advances, which needs the guard's consumer.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Returns the region length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the ring had nothing to read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the whole region.
    pub fn consume(self) {
        let len = self.len;
        // SAFETY: len is the region length
        unsafe { self.consumer.commit_pop_unchecked(len) };
    }

    /// Consumes exactly `n` bytes (where `n <= len()`).
    pub fn try_consume_n(self, n: usize) -> Result<(), CommitError> {
        if n > self.len {
            return Err(CommitError {
                attempted: n,
                available: self.len,
            });
        }
        // SAFETY: We just verified n <= self.len
        unsafe { self.consumer.commit_pop_unchecked(n) };
        Ok(())
    }

    /// Consumes `n` bytes, saturating at `len()`.
    ///
    /// Returns the number of bytes actually consumed.
    pub fn consume_up_to(self, n: usize) -> usize {
        let to_consume = n.min(self.len);
        // SAFETY: to_consume <= self.len by construction
        unsafe { self.consumer.commit_pop_unchecked(to_consume) };
        to_consume
    }
}

impl AsRef<[u8]> for ReadRegion<'_, '_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use crate::{ByteRing, CommitError};

    #[test]
    fn test_write_region_commit_variants() {
        let mut storage = [0u8; 8];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        let mut region = producer.write_region();
        assert_eq!(region.len(), 8);
        region.as_mut_slice()[..2].copy_from_slice(b"ab");
        assert_eq!(region.commit_up_to(2), 2);

        let region = producer.write_region();
        assert_eq!(region.len(), 6);
        assert_eq!(
            region.try_commit_n(7),
            Err(CommitError {
                attempted: 7,
                available: 6
            })
        );

        // Dropped guard commits nothing
        drop(producer.write_region());
        assert_eq!(consumer.available(), 2);

        let region = consumer.read_region();
        assert_eq!(region.as_slice(), b"ab");
        region.consume();
        assert!(consumer.read_region().is_empty());
    }

    #[test]
    fn test_read_region_partial_consume() {
        let mut storage = [0u8; 8];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        let mut region = producer.write_region();
        region.as_mut_slice()[..4].copy_from_slice(b"wxyz");
        region.try_commit_n(4).unwrap();

        let region = consumer.read_region();
        assert_eq!(region.consume_up_to(1), 1);
        let region = consumer.read_region();
        assert_eq!(region.as_ref(), b"xyz");
        assert!(region.try_consume_n(4).is_err());
        assert_eq!(consumer.available(), 3);
    }
}
