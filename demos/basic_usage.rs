//! Minimal end-to-end demo of all three queues.
//!
//! Run: cargo run --example basic_usage
//! (wired up via the root Cargo.toml's `[[example]]` entry, since this file
//! lives under demos/ rather than examples/ — see README.md)

use std::sync::Arc;
use std::thread;

use sluice::{MpmcQueue, MpscQueue, SpscQueue};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    spsc_demo();
    mpmc_demo();
    mpsc_demo();
}

fn spsc_demo() {
    let ring = Arc::new(SpscQueue::new(1024).unwrap());

    let producer_ring = ring.clone();
    let producer = thread::spawn(move || {
        for i in 0..10_000u64 {
            while !producer_ring.enqueue(i) {
                std::hint::spin_loop();
            }
        }
    });

    let mut sum = 0u64;
    let mut received = 0u64;
    while received < 10_000 {
        if let Some(v) = ring.dequeue() {
            sum += v;
            received += 1;
        } else {
            std::hint::spin_loop();
        }
    }
    producer.join().unwrap();
    println!("spsc: sum of 0..10000 = {sum}");
}

fn mpmc_demo() {
    let ring = Arc::new(MpmcQueue::new(1024).unwrap());
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 5_000;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let ring = ring.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    while !ring.enqueue(p * PER_PRODUCER + i) {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();

    let mut received = 0u64;
    while received < PRODUCERS * PER_PRODUCER {
        if ring.dequeue().is_some() {
            received += 1;
        } else {
            std::hint::spin_loop();
        }
    }
    for p in producers {
        p.join().unwrap();
    }
    println!("mpmc: received {received} values from {PRODUCERS} producers");
}

fn mpsc_demo() {
    let fanout = Arc::new(MpscQueue::new(256, 4).unwrap());
    const PRODUCERS: u64 = 8;
    const PER_PRODUCER: u64 = 1_000;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let fanout = fanout.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    while !fanout.enqueue(p * PER_PRODUCER + i) {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let mut total = 0u64;
    while fanout.dequeue_batch(|_| total += 1) {}
    println!("mpsc: drained {total} values from {PRODUCERS} producers across {} shards", fanout.concurrency());
}
