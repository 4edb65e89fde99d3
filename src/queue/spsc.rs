//! Single-producer/single-consumer ring queue.
//!
//! The algorithmic primitive everything else in this crate builds on: two
//! monotonic indices (`head`, `tail`), no CAS, no locks. The producer only
//! ever writes `tail`; the consumer only ever writes `head`. A release
//! store on the writing side paired with an acquire load on the reading
//! side establishes the happens-before edge that publishes the slot's
//! payload.
//!
//! # Contract
//!
//! Exactly one thread may call [`SpscQueue::enqueue`] and exactly one
//! (possibly different) thread may call [`SpscQueue::dequeue`]. Calling
//! either method from more than one thread at a time is undefined behavior
//! — reach for [`crate::MpmcQueue`] if that's what you need.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::Ordering;

use tracing::debug;

use crate::error::{check_capacity, Result};
use crate::padding::{padded_sequence, PaddedSequence};

/// A bounded, lock-free single-producer/single-consumer queue.
pub struct SpscQueue<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Written only by the consumer; read by the producer to check fullness.
    head: PaddedSequence,
    /// Written only by the producer; read by the consumer to check emptiness.
    tail: PaddedSequence,
}

unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Create a queue that holds at most `capacity` elements. `capacity`
    /// must be a power of two, at least 2.
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        debug!(capacity, "creating spsc queue");

        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            buffer,
            mask: capacity - 1,
            head: padded_sequence(0),
            tail: padded_sequence(0),
        })
    }

    /// The fixed capacity this queue was constructed with.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Approximate current occupancy. Always in `[0, capacity()]`; exact if
    /// no enqueue/dequeue races the call.
    #[inline]
    pub fn size(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    /// Append `value`. Returns `false` without side effect if the queue is
    /// full. Producer-side only.
    #[inline]
    pub fn enqueue(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) as usize == self.capacity() {
            return false;
        }

        let idx = (tail as usize) & self.mask;
        unsafe {
            (*self.buffer[idx].get()).write(value);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Remove and return the oldest element, or `None` if the queue is
    /// empty. Consumer-side only.
    #[inline]
    pub fn dequeue(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let idx = (head as usize) & self.mask;
        let value = unsafe { (*self.buffer[idx].get()).assume_init_read() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut seq = head;
        while seq != tail {
            let idx = (seq as usize) & self.mask;
            unsafe {
                (*self.buffer[idx].get()).assume_init_drop();
            }
            seq = seq.wrapping_add(1);
        }
    }
}
