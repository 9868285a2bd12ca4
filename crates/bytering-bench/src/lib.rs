//! Stress harness, cycle profiler and lock-based baseline queues for
//! [`bytering`].
//!
//! The harness moves a long countdown byte pattern from a producer thread to a
//! consumer thread through one queue at a time, checks every delivered byte
//! and reports per-call cycle counts. Besides the lock-free ring it drives
//! three mutex-based queues for comparison.
//!
//! # Example
//!
//! ```
//! use bytering_bench::{run_stress, QueueKind, StressConfig};
//!
//! let config = StressConfig::new(1 << 20, 4096, 512, 0).with_seed(7);
//! let report = run_stress(&config, QueueKind::LockFree).unwrap();
//! assert_eq!(report.bytes, 1 << 20);
//!
//! let mut out = Vec::new();
//! report.profiler.report(&mut out).unwrap();
//! ```

mod backoff;
pub mod baseline;
mod config;
mod error;
mod harness;
mod pattern;
mod profiler;

pub use backoff::Backoff;
pub use config::{StressConfig, FULL_CONFIG, QUICK_CONFIG};
pub use error::HarnessError;
pub use harness::{run_stress, QueueKind, StressReport};
pub use pattern::{fill_pattern, pattern_byte, verify_pattern, Mismatch};
pub use profiler::{cycles, Measure, Profiler, ScopedTimer};
