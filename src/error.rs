//! Error types for the sluice queues

use thiserror::Error;

/// Result type alias for sluice operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Construction-time errors for the queues in this crate.
///
/// These are the only fallible paths in the crate: once a queue is built,
/// `enqueue`/`dequeue` report full/empty as plain booleans (see module docs),
/// never as errors.
#[derive(Error, Debug)]
pub enum QueueError {
    /// A ring capacity was not a power of two, or was zero.
    #[error("invalid capacity: {message}")]
    InvalidCapacity {
        /// Description of why the capacity was rejected
        message: String,
    },

    /// An MPSC fanout concurrency value was not a power of two, was zero,
    /// or exceeded the configured maximum shard count.
    #[error("invalid concurrency: {message}")]
    InvalidConcurrency {
        /// Description of why the concurrency was rejected
        message: String,
    },
}

impl QueueError {
    /// Build an [`QueueError::InvalidCapacity`]
    pub fn invalid_capacity(message: impl Into<String>) -> Self {
        Self::InvalidCapacity {
            message: message.into(),
        }
    }

    /// Build an [`QueueError::InvalidConcurrency`]
    pub fn invalid_concurrency(message: impl Into<String>) -> Self {
        Self::InvalidConcurrency {
            message: message.into(),
        }
    }
}

/// Validate that `capacity` is usable as a ring size: a power of two, and
/// at least 2 (a 1-slot ring can never distinguish "full" from "empty" under
/// the `tail - head` accounting this crate uses).
pub(crate) fn check_capacity(capacity: usize) -> Result<()> {
    if capacity < 2 || !capacity.is_power_of_two() {
        return Err(QueueError::invalid_capacity(format!(
            "capacity must be a power of two >= 2, got {capacity}"
        )));
    }
    Ok(())
}
