//! Building blocks for the lazy sweep: the sampling gate and the
//! single-flight guard.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Uniform samples in `[0, 1)` used to gate sweeps.
pub trait RandomSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Thread-local generator from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Always returns the same sample. Counts how often it was drawn.
#[derive(Debug, Default)]
pub struct FixedRandom {
    value: f64,
    draws: AtomicUsize,
}

impl FixedRandom {
    /// Create a source that always yields `value`.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            draws: AtomicUsize::new(0),
        }
    }

    /// Number of samples drawn so far.
    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }
}

impl RandomSource for FixedRandom {
    fn sample(&self) -> f64 {
        self.draws.fetch_add(1, Ordering::SeqCst);
        self.value
    }
}

/// Whether a drawn `sample` lets a sweep through at `probability`.
pub(crate) fn passes_gate(sample: f64, probability: f64) -> bool {
    sample <= probability
}

/// Holds the running flag for the duration of one sweep.
///
/// Dropping the guard clears the flag, including on unwind.
pub(crate) struct SweepGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> SweepGuard<'a> {
    /// Take the flag, or `None` if another sweep holds it.
    pub(crate) fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Outcome of one executed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub removed: usize,
    pub elapsed: Duration,
}

impl SweepReport {
    pub(crate) fn finished_message(&self) -> String {
        format!(
            "garbage collection finished, removed {} sessions in {}ms",
            self.removed,
            self.elapsed.as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_in_unit_range() {
        for _ in 0..1_000 {
            let sample = ThreadRandom.sample();
            assert!((0.0..1.0).contains(&sample));
        }
    }

    #[test]
    fn test_fixed_random_counts_draws() {
        let random = FixedRandom::new(0.25);
        assert_eq!(random.sample(), 0.25);
        assert_eq!(random.sample(), 0.25);
        assert_eq!(random.draws(), 2);
    }

    #[test]
    fn test_gate() {
        assert!(passes_gate(0.0, 1.0));
        assert!(passes_gate(0.999, 1.0));
        assert!(passes_gate(0.05, 0.05));
        assert!(!passes_gate(0.5, 0.0000001));
    }

    #[test]
    fn test_guard_is_single_flight() {
        let running = AtomicBool::new(false);

        let guard = SweepGuard::acquire(&running).unwrap();
        assert!(running.load(Ordering::SeqCst));
        assert!(SweepGuard::acquire(&running).is_none());

        drop(guard);
        assert!(!running.load(Ordering::SeqCst));
        assert!(SweepGuard::acquire(&running).is_some());
    }

    #[test]
    fn test_finished_message() {
        let report = SweepReport {
            removed: 3,
            elapsed: Duration::from_millis(12),
        };
        assert_eq!(
            report.finished_message(),
            "garbage collection finished, removed 3 sessions in 12ms"
        );
    }
}
