//! Core module: Lock-Free SPSC Ring Buffer
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic load/store acquire-release, tanpa CAS
//! - No-Allocation: Semua slot pre-allocated saat init
//! - Single owner per counter: producer menulis `head`, consumer menulis `tail`

mod error;
mod handle;
mod ring_buffer;

pub use error::Full;
pub use handle::{Consumer, Producer};
pub use ring_buffer::RingBuffer;
