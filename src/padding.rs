//! Cache-line padding for the shared atomics every ring keeps between its
//! producer and consumer sides.
//!
//! False sharing is a performance pathology, not a correctness one, but this
//! crate treats the padding as an invariant of the design rather than an
//! optional tune-up (see the ring modules' docs): `head` and `tail` must
//! never share a cache line with each other or with the slot buffer's base
//! pointer.

use std::sync::atomic::{AtomicI64, AtomicU64};

use crossbeam_utils::CachePadded;

/// A monotonic 64-bit counter isolated on its own cache line.
pub type PaddedSequence = CachePadded<AtomicU64>;

/// Build a [`PaddedSequence`] initialized to `initial`.
#[inline]
pub fn padded_sequence(initial: u64) -> PaddedSequence {
    CachePadded::new(AtomicU64::new(initial))
}

/// A signed 64-bit counter isolated on its own cache line, used by the
/// Vyukov MPMC ring for `head`/`tail`, matching the original implementation's
/// use of a signed index so the producer/consumer diff math in that
/// algorithm never has to reason about unsigned underflow.
pub type PaddedSignedSequence = CachePadded<AtomicI64>;

/// Build a [`PaddedSignedSequence`] initialized to `initial`.
#[inline]
pub fn padded_signed_sequence(initial: i64) -> PaddedSignedSequence {
    CachePadded::new(AtomicI64::new(initial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn padded_sequence_occupies_a_full_cache_line() {
        assert!(size_of::<PaddedSequence>() >= crate::constants::CACHE_LINE_SIZE);
    }
}
