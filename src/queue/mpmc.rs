//! Multi-producer/multi-consumer ring queue using Dmitry Vyukov's
//! per-slot sequence-number scheme.
//!
//! Unlike the SPSC ring, any number of producers may call [`MpmcQueue::enqueue`]
//! and any number of consumers may call [`MpmcQueue::dequeue`] concurrently.
//! Coordination is a per-slot atomic `sequence` rather than a single shared
//! lock: a slot is writable when its sequence equals the producer's claimed
//! ticket, and readable when its sequence equals the consumer's claimed
//! ticket plus one. Producers and consumers race on `tail`/`head` with CAS;
//! losers simply re-read and retry, so every operation either completes or
//! observes a definitive full/empty condition in a bounded number of atomic
//! steps (lock-free, not formally wait-free under unbounded contention).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

use crate::error::{check_capacity, Result};
use crate::padding::{padded_signed_sequence, PaddedSignedSequence};

struct Slot<T> {
    sequence: AtomicI64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// A bounded, lock-free multi-producer/multi-consumer queue.
pub struct MpmcQueue<T> {
    buffer: Box<[Slot<T>]>,
    mask: i64,
    head: PaddedSignedSequence,
    tail: PaddedSignedSequence,
}

unsafe impl<T: Send> Send for MpmcQueue<T> {}
unsafe impl<T: Send> Sync for MpmcQueue<T> {}

impl<T> MpmcQueue<T> {
    /// Create a queue that holds at most `capacity` elements. `capacity`
    /// must be a power of two, at least 2.
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        debug!(capacity, "creating mpmc queue");

        let buffer = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicI64::new(i as i64),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            buffer,
            mask: capacity as i64 - 1,
            head: padded_signed_sequence(0),
            tail: padded_signed_sequence(0),
        })
    }

    /// The fixed capacity this queue was constructed with.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        (self.mask + 1) as usize
    }

    /// Approximate current occupancy. Always in `[0, capacity()]`.
    #[inline]
    pub fn size(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        (tail - head).max(0) as usize
    }

    /// Append `value`. Returns `false` without side effect if no slot can
    /// be claimed (the ring is full).
    pub fn enqueue(&self, value: T) -> bool {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[(tail & self.mask) as usize];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq - tail;

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            (*slot.value.get()).write(value);
                        }
                        slot.sequence.store(tail.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => {
                        tail = current;
                    }
                }
            } else if diff < 0 {
                return false;
            } else {
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Remove and return the oldest element, or `None` if the ring is
    /// empty.
    pub fn dequeue(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[(head & self.mask) as usize];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq - head.wrapping_add(1);

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(head.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => {
                        head = current;
                    }
                }
            } else if diff < 0 {
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }
}

impl<T> Drop for MpmcQueue<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut seq = head;
        while seq != tail {
            let slot = &self.buffer[(seq & self.mask) as usize];
            unsafe {
                (*slot.value.get()).assume_init_drop();
            }
            seq = seq.wrapping_add(1);
        }
    }
}
