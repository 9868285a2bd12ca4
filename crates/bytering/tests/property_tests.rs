//! Property-based tests for the ring invariants.
//!
//! Each test drives a random sequence of region requests and commits through a
//! single-threaded ring and checks it against a `VecDeque` model.

#![cfg(not(feature = "loom"))]

use bytering::ByteRing;
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    /// Request a push region and commit up to n bytes of it
    Push(usize),
    /// Request a pop region and commit up to n bytes of it
    Pop(usize),
}

fn op_strategy(max: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..=max).prop_map(Op::Push),
        (0..=max).prop_map(Op::Pop),
    ]
}

// =============================================================================
// Capacity derivation
// =============================================================================

proptest! {
    /// Capacity is the largest power of two not exceeding the storage length
    #[test]
    fn prop_capacity_is_floor_power_of_two(len in 1usize..100_000) {
        let mut storage = vec![0u8; len];
        let ring = ByteRing::new(&mut storage);
        let cap = ring.capacity();

        prop_assert!(cap.is_power_of_two());
        prop_assert!(cap <= len);
        prop_assert!(cap * 2 > len, "capacity {} is not the largest for len {}", cap, len);
    }
}

// =============================================================================
// Bounded count: 0 ≤ tail - head ≤ capacity, and regions stay in storage
// =============================================================================

proptest! {
    #[test]
    fn prop_bounded_count_and_region_bounds(
        storage_len in 1usize..64,
        ops in prop::collection::vec(op_strategy(80), 1..200),
    ) {
        let mut storage = vec![0u8; storage_len];
        let mut ring = ByteRing::new(&mut storage);
        let capacity = ring.capacity();
        let (mut producer, mut consumer) = ring.split();

        for op in ops {
            match op {
                Op::Push(n) => {
                    let free = producer.free();
                    let region = producer.push_region();
                    prop_assert!(region.len() <= free);
                    prop_assert!(region.len() <= capacity);
                    let n = n.min(region.len());
                    producer.commit_push(n).unwrap();
                }
                Op::Pop(n) => {
                    let available = consumer.available();
                    let region = consumer.pop_region();
                    prop_assert!(region.len() <= available);
                    let n = n.min(region.len());
                    consumer.commit_pop(n).unwrap();
                }
            }
            let buffered = consumer.available();
            prop_assert!(buffered <= capacity,
                "bounded count violated: {} > {}", buffered, capacity);
            prop_assert_eq!(buffered + producer.free(), capacity);
        }
    }
}

// =============================================================================
// FIFO: bytes come out in the order they went in
// =============================================================================

proptest! {
    #[test]
    fn prop_fifo_matches_model(
        storage_len in 1usize..64,
        ops in prop::collection::vec(op_strategy(80), 1..300),
    ) {
        let mut storage = vec![0u8; storage_len];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        let mut model = VecDeque::new();
        let mut next = 0u8;

        for op in ops {
            match op {
                Op::Push(n) => {
                    let region = producer.push_region();
                    let n = n.min(region.len());
                    for b in &mut region[..n] {
                        *b = next;
                        model.push_back(next);
                        next = next.wrapping_add(1);
                    }
                    producer.commit_push(n).unwrap();
                }
                Op::Pop(n) => {
                    let region = consumer.pop_region();
                    let n = n.min(region.len());
                    for &b in &region[..n] {
                        prop_assert_eq!(Some(b), model.pop_front());
                    }
                    consumer.commit_pop(n).unwrap();
                }
            }
        }

        // Whatever is left drains in order too
        let mut rest = vec![0u8; model.len()];
        prop_assert_eq!(consumer.read(&mut rest), model.len());
        prop_assert!(rest.iter().copied().eq(model.iter().copied()));
        prop_assert!(consumer.pop_region().is_empty());
    }
}

// =============================================================================
// Contiguity: a region is the whole pending span cut at the end of storage
// =============================================================================

proptest! {
    #[test]
    fn prop_region_is_maximal_contiguous(
        rounds in prop::collection::vec((0usize..24, 0usize..24), 1..20),
    ) {
        const CAP: usize = 16;
        let mut storage = [0u8; CAP];
        let mut ring = ByteRing::new(&mut storage);
        let (mut producer, mut consumer) = ring.split();

        let mut head = 0usize;
        let mut tail = 0usize;

        for (push, pop) in rounds {
            tail += producer.write(&vec![0xAB; push]);
            head += consumer.read(&mut vec![0u8; pop]);

            let pending = tail - head;
            let expected_pop = pending.min(CAP - head % CAP);
            let expected_push = (CAP - pending).min(CAP - tail % CAP);

            prop_assert_eq!(consumer.pop_region().len(), expected_pop);
            prop_assert_eq!(producer.push_region().len(), expected_push);
        }
    }
}
