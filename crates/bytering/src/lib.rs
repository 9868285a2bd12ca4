//! bytering - Lock-Free Single-Producer Single-Consumer Byte Ring
//!
//! A fixed-capacity byte ring buffer shared by exactly one producer thread
//! and one consumer thread, with zero-copy access to the underlying storage:
//! callers write into and read out of the ring's own memory instead of going
//! through per-byte copy calls.
//!
//! # Key Features
//!
//! - Caller-lent storage, no allocation (`&mut [u8]` or raw pointer + length)
//! - Power-of-two capacity with unbounded `head`/`tail` counters: empty and
//!   full are told apart without a separate element count
//! - Branchless contiguous-region computation
//! - Acquire/release protocol on `head`/`tail`, each on its own cache line
//! - Non-blocking: callers decide how to wait
//!
//! # Example
//!
//! ```
//! use bytering::ByteRing;
//!
//! let mut storage = [0u8; 10];
//! let mut ring = ByteRing::new(&mut storage);
//! assert_eq!(ring.capacity(), 8); // largest power of two <= 10
//!
//! let (mut producer, mut consumer) = ring.split();
//!
//! // Zero-copy: write straight into the ring, then publish
//! let region = producer.push_region();
//! region[..5].copy_from_slice(b"hello");
//! producer.commit_push(5).unwrap();
//!
//! // Zero-copy: read straight out of the ring, then release
//! assert_eq!(consumer.pop_region(), &b"hello"[..]);
//! consumer.commit_pop(5).unwrap();
//! assert!(consumer.pop_region().is_empty());
//! ```
//!
//! # Threads
//!
//! ```
//! use bytering::ByteRing;
//! use std::thread;
//!
//! let mut storage = vec![0u8; 64];
//! let mut ring = ByteRing::new(&mut storage);
//! let (mut producer, mut consumer) = ring.split();
//!
//! thread::scope(|s| {
//!     s.spawn(move || {
//!         let data: Vec<u8> = (0..=255).collect();
//!         let mut sent = 0;
//!         while sent < data.len() {
//!             sent += producer.write(&data[sent..]);
//!         }
//!     });
//!     s.spawn(move || {
//!         let mut out = vec![0u8; 256];
//!         let mut got = 0;
//!         while got < out.len() {
//!             got += consumer.read(&mut out[got..]);
//!         }
//!         assert!(out.iter().enumerate().all(|(i, b)| *b == i as u8));
//!     });
//! });
//! ```

mod error;
mod invariants;
mod region;
mod ring;
mod sync;

pub use error::CommitError;
pub use region::{ReadRegion, WriteRegion};
pub use ring::{ByteRing, Consumer, Producer};
