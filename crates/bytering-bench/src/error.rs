use crate::QueueKind;
use thiserror::Error;

/// Error types for stress runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// A configuration field is out of range.
    #[error("invalid stress config: {0}")]
    InvalidConfig(&'static str),
    /// The consumer saw a byte that differs from what the producer wrote.
    #[error(
        "{queue} queue corrupted at byte {position}: expected {expected:#04x}, got {actual:#04x}"
    )]
    Corrupted {
        /// Queue under test.
        queue: QueueKind,
        /// Stream position of the bad byte (0-based).
        position: u64,
        /// Byte the producer wrote there.
        expected: u8,
        /// Byte the consumer read.
        actual: u8,
    },
    /// The producer finished but the consumer is still missing bytes.
    #[error("{queue} queue lost {missing} byte(s) of the stream")]
    Truncated {
        /// Queue under test.
        queue: QueueKind,
        /// Bytes never delivered.
        missing: u64,
    },
    /// The consumer found bytes after the whole stream was delivered.
    #[error("{queue} queue delivered {extra} byte(s) past the end of the stream")]
    Overrun {
        /// Queue under test.
        queue: QueueKind,
        /// Number of unexpected bytes seen.
        extra: usize,
    },
}
