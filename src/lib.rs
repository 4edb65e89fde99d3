//! sluice - bounded, lock-free ring queues for in-process message passing
//!
//! Three queues, in dependency order:
//!
//! | Queue | Producers | Consumers | Ordering |
//! |---|---|---|---|
//! | [`SpscQueue`] | 1 | 1 | strict FIFO |
//! | [`MpmcQueue`] | N | N | strict FIFO by slot sequence |
//! | [`MpscQueue`] | N | 1 | approximate FIFO by capture timestamp |
//!
//! All three share the same shape: a fixed power-of-two capacity chosen at
//! construction, no dynamic resizing, no blocking, no allocation once built.
//! `enqueue`/`dequeue` report full/empty synchronously as a `bool`/`Option`
//! rather than blocking or erroring — the only fallible operation in this
//! crate is construction with a bad capacity or concurrency.
//!
//! `SpscQueue` is the primitive: two monotonic indices, no CAS. `MpmcQueue`
//! adds Dmitry Vyukov's per-slot sequence-number handshake so many producers
//! and many consumers can share one ring. `MpscQueue` is a composite: `K`
//! independent `SpscQueue` shards, picked by hashing a monotonic timestamp,
//! merged at a single consumer through a priority queue ordered by that same
//! timestamp. See each module's docs for the ordering guarantees and the
//! specific trade-off that composite makes.

pub mod constants;
pub mod error;
pub mod padding;
pub mod queue;
pub mod spinlock;
pub mod time;

pub use error::{QueueError, Result};
pub use queue::{MpmcQueue, MpscConfig, MpscQueue, SpscQueue};

/// Crate version, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_constructs_all_three_queues() {
        assert!(SpscQueue::<i32>::new(4).is_ok());
        assert!(MpmcQueue::<i32>::new(4).is_ok());
        assert!(MpscQueue::<i32>::new(4, 2).is_ok());
    }
}
