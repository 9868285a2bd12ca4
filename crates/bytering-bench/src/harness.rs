//! Two-thread stress run: one producer pushes a countdown byte pattern of
//! random chunk sizes with random jitter, one consumer pops and checks every
//! byte, and both time each queue call with their own [`Profiler`].

use crate::baseline::{
    ByteQueue, LockFreeDivQueue, QueueConsumer, QueueProducer, RegionQueue, VectorQueue,
};
use crate::{cycles, fill_pattern, verify_pattern, Backoff, HarnessError, Profiler, StressConfig};
use bytering::ByteRing;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// RNG stream offsets so the two threads draw different sequences from one seed
const PRODUCER_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;
const CONSUMER_STREAM: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// Queue implementation under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// The lock-free `bytering` ring
    LockFree,
    /// [`LockFreeDivQueue`]: lock-free, any length, `/` and `%` epochs
    LockFreeDiv,
    /// [`ByteQueue`]: one lock per byte
    Byte,
    /// [`VectorQueue`]: one lock per slice copy
    Vector,
    /// [`RegionQueue`]: one lock per region
    Region,
}

impl QueueKind {
    /// Every queue, in report order.
    pub const ALL: [QueueKind; 5] = [
        QueueKind::LockFree,
        QueueKind::LockFreeDiv,
        QueueKind::Byte,
        QueueKind::Vector,
        QueueKind::Region,
    ];

    /// Short name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            QueueKind::LockFree => "lock-free",
            QueueKind::LockFreeDiv => "lock-free-div",
            QueueKind::Byte => "byte",
            QueueKind::Vector => "vector",
            QueueKind::Region => "region",
        }
    }

    /// Profiler label for push calls.
    pub const fn push_label(self) -> &'static str {
        match self {
            QueueKind::LockFree => "lock-free push",
            QueueKind::LockFreeDiv => "lock-free-div push",
            QueueKind::Byte => "byte push",
            QueueKind::Vector => "vector push",
            QueueKind::Region => "region push",
        }
    }

    /// Profiler label for pop calls.
    pub const fn pop_label(self) -> &'static str {
        match self {
            QueueKind::LockFree => "lock-free pop",
            QueueKind::LockFreeDiv => "lock-free-div pop",
            QueueKind::Byte => "byte pop",
            QueueKind::Vector => "vector pop",
            QueueKind::Region => "region pop",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a successful stress run.
#[derive(Debug, Clone)]
pub struct StressReport {
    /// Queue that was driven
    pub queue: QueueKind,
    /// Bytes delivered and verified
    pub bytes: u64,
    /// Wall-clock time of the transfer
    pub elapsed: Duration,
    /// Push and pop timings of both threads
    pub profiler: Profiler,
}

impl StressReport {
    /// Delivered MiB per second of wall-clock time.
    pub fn mib_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / f64::from(1u32 << 20) / secs
    }
}

/// Moves `config.bytes_to_produce` bytes through `queue` between two threads
/// and verifies every byte on the way out.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidConfig`] before starting if the config is
/// unusable, and [`HarnessError::Corrupted`], [`HarnessError::Truncated`] or
/// [`HarnessError::Overrun`] if the delivered stream differs from the
/// produced one.
pub fn run_stress(config: &StressConfig, queue: QueueKind) -> Result<StressReport, HarnessError> {
    config.validate()?;
    info!(
        %queue,
        bytes = config.bytes_to_produce,
        queue_size = config.queue_size,
        max_bytes_per_op = config.max_bytes_per_op,
        max_sleep_us = config.max_sleep_us,
        "starting stress run"
    );

    let started = Instant::now();
    let profiler = match queue {
        QueueKind::LockFree => {
            let mut storage = vec![0u8; config.queue_size];
            let mut ring = ByteRing::new(&mut storage);
            debug!(capacity = ring.capacity(), "lock-free ring ready");
            let (producer, consumer) = ring.split();
            drive(config, queue, producer, consumer)?
        }
        QueueKind::LockFreeDiv => {
            let mut q = LockFreeDivQueue::new(config.queue_size);
            let (producer, consumer) = q.split();
            drive(config, queue, producer, consumer)?
        }
        QueueKind::Byte => {
            let q = ByteQueue::new(config.queue_size);
            drive(config, queue, &q, &q)?
        }
        QueueKind::Vector => {
            let q = VectorQueue::new(config.queue_size);
            drive(config, queue, &q, &q)?
        }
        QueueKind::Region => {
            let q = RegionQueue::new(config.queue_size);
            drive(config, queue, &q, &q)?
        }
    };

    let report = StressReport {
        queue,
        bytes: config.bytes_to_produce,
        elapsed: started.elapsed(),
        profiler,
    };
    info!(
        %queue,
        elapsed_ms = report.elapsed.as_millis() as u64,
        mib_per_sec = report.mib_per_sec(),
        "stress run complete"
    );
    Ok(report)
}

fn drive<P, C>(
    config: &StressConfig,
    queue: QueueKind,
    producer: P,
    consumer: C,
) -> Result<Profiler, HarnessError>
where
    P: QueueProducer + Send,
    C: QueueConsumer + Send,
{
    let finished = AtomicBool::new(false);
    let abort = AtomicBool::new(false);
    let (finished, abort) = (&finished, &abort);

    let (produced, consumed) = thread::scope(|s| {
        let producer_thread = s.spawn(move || produce(config, queue, producer, finished, abort));
        let consumer_thread = s.spawn(move || consume(config, queue, consumer, finished, abort));
        // Consumer first: its failure or panic is what stops the producer
        let consumed = join(consumer_thread);
        (join(producer_thread), consumed)
    });

    let mut profiler = consumed.inspect_err(|e| warn!(%queue, error = %e, "stress run failed"))?;
    profiler.merge(&produced);
    Ok(profiler)
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
}

/// Raises a flag when dropped, including while unwinding.
struct RaiseOnDrop<'a>(&'a AtomicBool);

impl Drop for RaiseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn produce<P: QueueProducer>(
    config: &StressConfig,
    queue: QueueKind,
    mut producer: P,
    finished: &AtomicBool,
    abort: &AtomicBool,
) -> Profiler {
    let _finished = RaiseOnDrop(finished);
    let mut rng = rng_for(config, PRODUCER_STREAM);
    let mut profiler = Profiler::new();
    let mut bytes = vec![0u8; config.max_bytes_per_op];
    let mut backoff = Backoff::new();
    let mut remaining = config.bytes_to_produce;
    let mut stalls = 0u64;

    while remaining > 0 && !abort.load(Ordering::Relaxed) {
        jitter(&mut rng, config.max_sleep_us);
        let chunk = &mut bytes[..chunk_len(&mut rng, config.max_bytes_per_op, remaining)];
        fill_pattern(chunk, remaining);

        let pushed = {
            let _t = profiler.time(queue.push_label());
            producer.push(chunk)
        };

        if pushed == 0 {
            stalls += 1;
            backoff.snooze();
        } else {
            backoff.reset();
            remaining -= pushed as u64;
        }
    }

    debug!(%queue, stalls, "producer finished");
    profiler
}

fn consume<C: QueueConsumer>(
    config: &StressConfig,
    queue: QueueKind,
    mut consumer: C,
    finished: &AtomicBool,
    abort: &AtomicBool,
) -> Result<Profiler, HarnessError> {
    // Any exit stops the producer; on success it has already finished
    let _abort = RaiseOnDrop(abort);
    let total = config.bytes_to_produce;
    let mut rng = rng_for(config, CONSUMER_STREAM);
    let mut profiler = Profiler::new();
    let mut scratch = vec![0u8; config.max_bytes_per_op];
    let mut backoff = Backoff::new();
    let mut remaining = total;
    let mut stalls = 0u64;

    while remaining > 0 {
        // Read before popping: if the producer was already done, an empty
        // pop means bytes went missing
        let done = finished.load(Ordering::Acquire);
        jitter(&mut rng, config.max_sleep_us);
        let want = chunk_len(&mut rng, config.max_bytes_per_op, remaining);

        let mut checked = Ok(());
        let (popped, pop_cycles) = timed_pop(&mut consumer, want, &mut scratch, |bytes| {
            checked = verify_pattern(bytes, remaining);
        });
        profiler.record(queue.pop_label(), pop_cycles);

        if let Err(m) = checked {
            return Err(HarnessError::Corrupted {
                queue,
                position: total - remaining + m.offset as u64,
                expected: m.expected,
                actual: m.actual,
            });
        }

        if popped == 0 {
            if done {
                return Err(HarnessError::Truncated {
                    queue,
                    missing: remaining,
                });
            }
            stalls += 1;
            backoff.snooze();
        } else {
            backoff.reset();
            remaining -= popped as u64;
        }
    }

    while !finished.load(Ordering::Acquire) {
        backoff.snooze();
    }
    let mut extra = 0;
    loop {
        let n = consumer.pop(&mut scratch);
        if n == 0 {
            break;
        }
        extra += n;
    }
    if extra > 0 {
        return Err(HarnessError::Overrun { queue, extra });
    }

    debug!(%queue, stalls, "consumer finished");
    Ok(profiler)
}

/// Pops up to `want` bytes, showing them to `check`.
///
/// Returns the popped count and the cycles spent in the queue call, not
/// counting the time spent in `check`.
fn timed_pop<C, F>(consumer: &mut C, want: usize, scratch: &mut [u8], check: F) -> (usize, u64)
where
    C: QueueConsumer,
    F: FnOnce(&[u8]),
{
    let mut check_cycles = 0;
    let start = cycles();
    let popped = consumer.pop_in_place(want, scratch, |bytes| {
        let check_start = cycles();
        check(bytes);
        check_cycles = cycles().wrapping_sub(check_start);
    });
    (popped, cycles().wrapping_sub(start).wrapping_sub(check_cycles))
}

fn rng_for(config: &StressConfig, stream: u64) -> SmallRng {
    match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed ^ stream),
        None => SmallRng::from_entropy(),
    }
}

#[inline]
fn chunk_len(rng: &mut SmallRng, max_bytes_per_op: usize, remaining: u64) -> usize {
    let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
    rng.gen_range(1..=max_bytes_per_op).min(remaining)
}

#[inline]
fn jitter(rng: &mut SmallRng, max_sleep_us: u64) {
    if max_sleep_us > 0 {
        thread::sleep(Duration::from_micros(rng.gen_range(0..max_sleep_us)));
    }
}
