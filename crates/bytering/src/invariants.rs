//! Debug assertion macros for ring buffer invariants.
//!
//! These are only active in debug builds (`debug_assert!`), so the hot path
//! carries no checks in release builds. The `unsafe` unchecked commit methods
//! rely on them to catch contract violations during development.

// =============================================================================
// Bounded count: 0 ≤ (tail - head) ≤ capacity
// =============================================================================

/// Assert that the number of buffered bytes does not exceed capacity.
///
/// Used in: `Producer::commit_push_unchecked()` after computing the new tail
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded count violated: {} bytes buffered in a ring of capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head does not advance past tail.
///
/// Compared as wrapping distances from the old head, so the check holds
/// across counter wrap-around.
///
/// Used in: `Consumer::commit_pop_unchecked()` before publishing head
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head.wrapping_sub($head) <= $tail.wrapping_sub($head),
            "head advanced past tail: head {} -> {}, tail {}",
            $head,
            $new_head,
            $tail
        )
    };
}

// =============================================================================
// Commit contract: count ≤ length of the last requested region
// =============================================================================

/// Assert that a commit stays within the most recently requested region.
macro_rules! debug_assert_within_region {
    ($side:literal, $count:expr, $region_len:expr) => {
        debug_assert!(
            $count <= $region_len,
            "{} commit of {} bytes exceeds the last region length {}",
            $side,
            $count,
            $region_len
        )
    };
}

// =============================================================================
// Region bounds: [offset, offset + len) ⊆ [0, capacity)
// =============================================================================

/// Assert that a computed region never leaves the storage.
///
/// Used in: both region-length computations
macro_rules! debug_assert_region_in_bounds {
    ($offset:expr, $len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity && $offset <= $capacity - $len,
            "region [{}, {}+{}) escapes storage of capacity {}",
            $offset,
            $offset,
            $len,
            $capacity
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_region_in_bounds;
pub(crate) use debug_assert_within_region;
