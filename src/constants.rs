//! Crate-wide constants

/// Cache line size for alignment (64 bytes on most modern CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

/// Default ring capacity when a caller doesn't otherwise pick one (must stay
/// a power of two)
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Upper bound on MPSC fanout shard count. There is no algorithmic reason
/// for a ceiling, but an unbounded shard count defeats the point of sharding
/// by timestamp modulo (each shard becomes starved) so a generous cap keeps
/// misuse from silently degrading into one-shard-per-producer allocation.
pub const MAX_MPSC_CONCURRENCY: usize = 4096;
