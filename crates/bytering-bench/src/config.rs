use crate::HarnessError;

/// Configuration for a stress run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    /// Bytes moved from producer to consumer per queue
    pub bytes_to_produce: u64,
    /// Queue storage size in bytes (the lock-free ring uses its power-of-two prefix)
    pub queue_size: usize,
    /// Upper bound of the random chunk size of one push or pop
    pub max_bytes_per_op: usize,
    /// Upper bound (exclusive) of the random sleep before each operation, in µs; 0 disables it
    pub max_sleep_us: u64,
    /// RNG seed for chunk sizes and sleeps; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl StressConfig {
    /// Creates a new configuration with custom settings.
    pub const fn new(
        bytes_to_produce: u64,
        queue_size: usize,
        max_bytes_per_op: usize,
        max_sleep_us: u64,
    ) -> Self {
        Self {
            bytes_to_produce,
            queue_size,
            max_bytes_per_op,
            max_sleep_us,
            seed: None,
        }
    }

    /// Returns the same configuration with a fixed RNG seed.
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects configurations the harness cannot run.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.queue_size == 0 {
            return Err(HarnessError::InvalidConfig("queue_size must be > 0"));
        }
        if self.max_bytes_per_op == 0 {
            return Err(HarnessError::InvalidConfig("max_bytes_per_op must be > 0"));
        }
        Ok(())
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        FULL_CONFIG
    }
}

/// Full run: 1 GiB through a 1 MiB queue, up to 1 KiB per op, up to 50 µs jitter
pub const FULL_CONFIG: StressConfig = StressConfig::new(1 << 30, 1 << 20, 1 << 10, 50);

/// Test-sized run: 8 MiB through a 64 KiB queue, no sleeps
pub const QUICK_CONFIG: StressConfig = StressConfig::new(8 << 20, 64 << 10, 1 << 10, 0);
