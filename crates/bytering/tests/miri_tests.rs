//! Miri-compatible tests for detecting undefined behavior.
//!
//! Run with: `cargo +nightly miri test -p bytering --test miri_tests`
//!
//! Miri checks the raw-pointer region slices for out-of-bounds access,
//! aliasing violations between the producer and consumer views, and data
//! races in the two-thread test. Sizes are kept small so Miri finishes
//! quickly.

#![cfg(not(feature = "loom"))]

use bytering::ByteRing;
use std::thread;

/// Regions at every offset of a small ring, wrapping several times.
#[test]
fn miri_regions_every_offset() {
    let mut storage = [0u8; 4];
    let mut ring = ByteRing::new(&mut storage);
    let (mut producer, mut consumer) = ring.split();

    for step in 0..12u8 {
        let region = producer.push_region();
        assert!(!region.is_empty());
        region[0] = step;
        producer.commit_push(1).unwrap();

        let region = consumer.pop_region();
        assert_eq!(region[0], step);
        consumer.commit_pop(1).unwrap();
    }
}

/// Producer and consumer views are live at the same time on disjoint bytes.
#[test]
fn miri_disjoint_views() {
    let mut storage = [0u8; 8];
    let mut ring = ByteRing::new(&mut storage);
    let (mut producer, mut consumer) = ring.split();

    assert_eq!(producer.write(b"abc"), 3);

    let mut write = producer.write_region();
    let read = consumer.read_region();
    assert_eq!(read.as_slice(), b"abc");
    write.as_mut_slice().fill(b'z');
    assert_eq!(read.as_slice(), b"abc");
    write.commit();
    read.consume();

    let mut out = [0u8; 5];
    assert_eq!(consumer.read(&mut out), 5);
    assert_eq!(&out, b"zzzzz");
}

/// Storage lent through a raw pointer; the remainder past the power of two
/// must never be touched.
#[test]
fn miri_raw_parts_non_power_of_two() {
    let mut storage = vec![0xEEu8; 6];
    let ptr = storage.as_mut_ptr();
    {
        // SAFETY: storage outlives the ring and is not accessed meanwhile
        let mut ring = unsafe { ByteRing::from_raw_parts(ptr, 6) };
        assert_eq!(ring.capacity(), 4);
        let (mut producer, _consumer) = ring.split();
        assert_eq!(producer.write(&[1; 10]), 4);
    }
    assert_eq!(storage, [1, 1, 1, 1, 0xEE, 0xEE]);
}

/// Small two-thread transfer so Miri's race detector sees the protocol.
#[test]
fn miri_two_threads() {
    const N: usize = 64;
    let mut storage = [0u8; 8];
    let mut ring = ByteRing::new(&mut storage);
    let (mut producer, mut consumer) = ring.split();

    thread::scope(|s| {
        s.spawn(move || {
            let data: Vec<u8> = (0..N as u8).collect();
            let mut sent = 0;
            while sent < N {
                sent += producer.write(&data[sent..]);
                thread::yield_now();
            }
        });
        s.spawn(move || {
            let mut got = 0;
            while got < N {
                let region = consumer.pop_region();
                for (i, b) in region.iter().enumerate() {
                    assert_eq!(*b as usize, got + i);
                }
                let n = region.len();
                consumer.commit_pop(n).unwrap();
                got += n;
                thread::yield_now();
            }
        });
    });
}
