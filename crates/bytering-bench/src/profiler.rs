//! Cycle-counting instrumentation.
//!
//! A [`Profiler`] is an ordinary value owned by whoever runs the benchmark,
//! typically one per thread, merged and reported once at the end. Timing is
//! scoped: [`Profiler::time`] returns a guard that records the elapsed cycles
//! when it is dropped, on every exit path.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{fence, Ordering};

/// Accumulated cost of one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measure {
    /// Total cycles over all executions
    pub cycles: u64,
    /// Number of recorded executions
    pub executions: u64,
}

impl Measure {
    /// Average cycles per execution (0 if never executed).
    pub fn average(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.cycles as f64 / self.executions as f64
        }
    }
}

/// Label → {total cycles, executions} table.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    measures: BTreeMap<&'static str, Measure>,
}

impl Profiler {
    /// Creates an empty profiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing `label`; the elapsed cycles are recorded when the guard drops.
    #[inline]
    pub fn time(&mut self, label: &'static str) -> ScopedTimer<'_> {
        ScopedTimer {
            profiler: self,
            label,
            start: cycles(),
        }
    }

    /// Records one execution of `label` that took `cycles`.
    #[inline]
    pub fn record(&mut self, label: &'static str, cycles: u64) {
        let measure = self.measures.entry(label).or_default();
        measure.cycles = measure.cycles.wrapping_add(cycles);
        measure.executions += 1;
    }

    /// Returns the measure for `label`, if it was ever recorded.
    pub fn get(&self, label: &str) -> Option<Measure> {
        self.measures.get(label).copied()
    }

    /// Iterates over all labels in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Measure)> + '_ {
        self.measures.iter().map(|(label, m)| (*label, *m))
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// Adds every measure of `other` into `self`.
    pub fn merge(&mut self, other: &Profiler) {
        for (label, m) in other.iter() {
            let measure = self.measures.entry(label).or_default();
            measure.cycles = measure.cycles.wrapping_add(m.cycles);
            measure.executions += m.executions;
        }
    }

    /// Writes the report, one line per label.
    pub fn report<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "====== PROFILER START ======")?;
        for (label, m) in self.iter() {
            writeln!(
                out,
                "{}: # Executions: {} | Tot. clocks: {} | Avg. clocks/exec: {:.6}",
                label,
                m.executions,
                m.cycles,
                m.average()
            )?;
        }
        writeln!(out, "====== PROFILER END ======")
    }
}

/// Guard returned by [`Profiler::time`].
#[must_use = "the scope is timed until the guard is dropped"]
pub struct ScopedTimer<'p> {
    profiler: &'p mut Profiler,
    label: &'static str,
    start: u64,
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = cycles().wrapping_sub(self.start);
        self.profiler.record(self.label, elapsed);
    }
}

/// Current timestamp in cycles.
///
/// `rdtsc` between full fences on x86_64 so the timed instructions cannot
/// drift across the read; monotonic nanoseconds elsewhere.
#[inline]
pub fn cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        fence(Ordering::SeqCst);
        // SAFETY: rdtsc is available on every x86_64 CPU
        #[allow(unused_unsafe)]
        let tsc = unsafe { core::arch::x86_64::_rdtsc() };
        fence(Ordering::SeqCst);
        tsc
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        use std::sync::OnceLock;
        use std::time::Instant;

        static EPOCH: OnceLock<Instant> = OnceLock::new();
        fence(Ordering::SeqCst);
        EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_timer_records_on_every_exit() {
        fn early_return(profiler: &mut Profiler, bail: bool) -> u32 {
            let _t = profiler.time("op");
            if bail {
                return 0;
            }
            1
        }

        let mut profiler = Profiler::new();
        early_return(&mut profiler, true);
        early_return(&mut profiler, false);

        let m = profiler.get("op").unwrap();
        assert_eq!(m.executions, 2);
    }

    #[test]
    fn test_merge_and_average() {
        let mut a = Profiler::new();
        a.record("push", 100);
        a.record("push", 300);

        let mut b = Profiler::new();
        b.record("push", 200);
        b.record("pop", 50);

        a.merge(&b);
        assert_eq!(
            a.get("push"),
            Some(Measure {
                cycles: 600,
                executions: 3
            })
        );
        assert_eq!(a.get("push").unwrap().average(), 200.0);
        assert_eq!(a.get("pop").unwrap().executions, 1);
        assert_eq!(Measure::default().average(), 0.0);
    }

    #[test]
    fn test_report_format() {
        let mut profiler = Profiler::new();
        profiler.record("BQ push", 30);
        profiler.record("BQ push", 10);

        let mut out = Vec::new();
        profiler.report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "====== PROFILER START ======\n\
             BQ push: # Executions: 2 | Tot. clocks: 40 | Avg. clocks/exec: 20.000000\n\
             ====== PROFILER END ======\n"
        );
    }
}
