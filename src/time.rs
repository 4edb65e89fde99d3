//! Monotonic cycle counter used by the MPSC fanout for shard dispatch and
//! timestamp ordering.
//!
//! The counter only needs to never decrease on a given CPU and be cheap to
//! read; it does not need to be wall-clock accurate. On x86_64 we read the
//! TSC directly. Elsewhere we fall back to a monotonic nanosecond clock,
//! which gives the same ordering guarantees at a higher per-call cost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Read the monotonic cycle counter.
///
/// Guarantees: never decreases when called repeatedly on one thread; safe
/// to call from any thread without synchronization.
#[inline(always)]
pub fn monotonic_cycle_counter() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::x86_64::_rdtsc()
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        monotonic_nanos()
    }
}

/// Monotonic nanosecond clock, used as the portable fallback for
/// [`monotonic_cycle_counter`] and available on its own for callers that
/// want wall-clock-comparable timestamps.
pub fn monotonic_nanos() -> u64 {
    static ORIGIN: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let origin = *ORIGIN.get_or_init(Instant::now);
    origin.elapsed().as_nanos() as u64
}

/// A simple per-thread-safe ticket source, used only in tests to hand out
/// strictly increasing synthetic timestamps when the real cycle counter's
/// resolution is too coarse to separate two back-to-back calls.
#[cfg(test)]
pub(crate) struct Ticket(AtomicU64);

#[cfg(test)]
impl Ticket {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_counter_is_monotonic_on_this_thread() {
        let mut prev = monotonic_cycle_counter();
        for _ in 0..1000 {
            let next = monotonic_cycle_counter();
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn nanos_clock_is_monotonic() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
    }
}
