use std::hint;
use std::thread;
use std::time::Duration;

/// Adaptive backoff for polling an empty or full queue.
///
/// Progressively increases wait time: spin with PAUSE → yield to OS → short
/// sleep. The rings never block, so the harness threads call this between
/// polls that made no progress and reset it on progress.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10; // Then sleep
    const PARK: Duration = Duration::from_micros(10);

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Waits a little longer than last time.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1u32 << self.step {
                hint::spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::sleep(Self::PARK);
        }
        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }

    /// True once spinning and yielding are exhausted and `snooze` sleeps.
    #[inline]
    pub fn is_parking(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    /// Reset after the queue made progress.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.snooze();
        assert!(b.step > 0);

        while !b.is_parking() {
            b.snooze();
        }
        // Stays parked without overflowing the step counter
        b.snooze();
        assert_eq!(b.step, Backoff::YIELD_LIMIT + 1);

        b.reset();
        assert_eq!(b.step, 0);
    }
}
