//! spsc-ring - Fixed-capacity lock-free SPSC queue
//!
//! Antrian untuk menyerahkan value dari tepat satu thread producer ke tepat
//! satu thread consumer tanpa lock, tanpa blocking, dan tanpa alokasi setelah
//! konstruksi.
//!
//! ```
//! use spsc_ring::RingBuffer;
//!
//! let mut rb: RingBuffer<u64, 8> = RingBuffer::new();
//! let (mut tx, mut rx) = rb.split();
//!
//! std::thread::scope(|s| {
//!     s.spawn(move || {
//!         for i in 0..100 {
//!             while tx.push(i).is_err() {
//!                 std::thread::yield_now();
//!             }
//!         }
//!     });
//!
//!     let mut received = 0;
//!     while received < 100 {
//!         match rx.try_pop() {
//!             Some(v) => {
//!                 assert_eq!(v, received);
//!                 received += 1;
//!             }
//!             None => std::thread::yield_now(),
//!         }
//!     }
//! });
//! ```

pub mod core;

pub use crate::core::{Consumer, Full, Producer, RingBuffer};
