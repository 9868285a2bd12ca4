//! Atomic types and storage access tracking used by the ring.
//!
//! Under `--features loom` these are loom's model-checked atomics, so the loom
//! tests exercise the real `ByteRing` code instead of a copy of it. The
//! storage itself is raw memory loom cannot see, so each region handed out is
//! also recorded against a shadow `loom::cell::UnsafeCell` per byte: a push
//! region as a write, a pop region as a read. Loom then reports a causality
//! violation if the head/tail ordering fails to separate the two sides.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "loom")]
pub(crate) struct StorageTracker {
    cells: Box<[loom::cell::UnsafeCell<u8>]>,
}

#[cfg(feature = "loom")]
impl StorageTracker {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            cells: (0..capacity).map(|_| loom::cell::UnsafeCell::new(0)).collect(),
        }
    }

    /// Records a producer write of `[offset, offset + len)`.
    pub(crate) fn write(&self, offset: usize, len: usize) {
        for cell in &self.cells[offset..offset + len] {
            cell.with_mut(|_| ());
        }
    }

    /// Records a consumer read of `[offset, offset + len)`.
    pub(crate) fn read(&self, offset: usize, len: usize) {
        for cell in &self.cells[offset..offset + len] {
            cell.with(|_| ());
        }
    }
}

#[cfg(not(feature = "loom"))]
pub(crate) struct StorageTracker;

#[cfg(not(feature = "loom"))]
impl StorageTracker {
    #[inline]
    pub(crate) fn new(_capacity: usize) -> Self {
        Self
    }

    #[inline]
    pub(crate) fn write(&self, _offset: usize, _len: usize) {}

    #[inline]
    pub(crate) fn read(&self, _offset: usize, _len: usize) {}
}
