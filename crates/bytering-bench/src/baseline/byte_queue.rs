use super::{LockedRing, QueueConsumer, QueueProducer};
use parking_lot::Mutex;

/// Mutex-protected byte queue that moves one byte per lock acquisition.
///
/// The slowest baseline: every byte pays for a lock round-trip.
#[derive(Debug)]
pub struct ByteQueue {
    ring: Mutex<LockedRing>,
}

impl ByteQueue {
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

    /// Appends one byte; false if full.
    pub fn push_byte(&self, byte: u8) -> bool {
        self.ring.lock().push_byte(byte)
    }

    /// Removes the oldest byte; `None` if empty.
    pub fn pop_byte(&self) -> Option<u8> {
        self.ring.lock().pop_byte()
    }
}

impl QueueProducer for &ByteQueue {
    fn push(&mut self, bytes: &[u8]) -> usize {
        for (i, &b) in bytes.iter().enumerate() {
            if !self.push_byte(b) {
                return i;
            }
        }
        bytes.len()
    }
}

impl QueueConsumer for &ByteQueue {
    fn pop(&mut self, out: &mut [u8]) -> usize {
        for (i, slot) in out.iter_mut().enumerate() {
            match self.pop_byte() {
                Some(b) => *slot = b,
                None => return i,
            }
        }
        out.len()
    }
}
