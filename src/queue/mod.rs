//! The three ring-queue algorithms this crate is built around.

pub mod mpmc;
pub mod mpsc;
pub mod spsc;

pub use mpmc::MpmcQueue;
pub use mpsc::{MpscConfig, MpscQueue};
pub use spsc::SpscQueue;
