//! Transfer Stress Test - dua thread, jutaan value
//!
//! Usage:
//!   cargo test --release --test transfer_stress_test -- --nocapture

use std::thread;
use std::time::Instant;

use spsc_ring::RingBuffer;

/// Statistik satu transfer
struct TransferStats {
    received: u64,
    duplicates: u64,
    out_of_order: u64,
}

impl TransferStats {
    fn new() -> Self {
        Self {
            received: 0,
            duplicates: 0,
            out_of_order: 0,
        }
    }

    fn record(&mut self, value: u64) {
        match value.cmp(&self.received) {
            std::cmp::Ordering::Equal => {}
            std::cmp::Ordering::Less => self.duplicates += 1,
            std::cmp::Ordering::Greater => self.out_of_order += 1,
        }
        self.received += 1;
    }
}

#[test]
fn test_transfer_five_million() {
    const COUNT: u64 = 5_000_000;
    let mut rb: RingBuffer<u64, 16384> = RingBuffer::new();
    let (mut tx, mut rx) = rb.split();

    let start = Instant::now();
    let stats = thread::scope(|s| {
        s.spawn(move || {
            for i in 0..COUNT {
                while !tx.emplace(|| i) {
                    thread::yield_now();
                }
            }
        });

        let consumer = s.spawn(move || {
            let mut stats = TransferStats::new();
            let mut value = 0u64;
            while stats.received < COUNT {
                if rx.pop(&mut value) {
                    stats.record(value);
                }
            }
            stats
        });

        consumer.join().unwrap()
    });
    let elapsed = start.elapsed();

    println!(
        "transferred {} values in {} ms",
        stats.received,
        elapsed.as_millis()
    );
    assert_eq!(stats.received, COUNT);
    assert_eq!(stats.duplicates, 0);
    assert_eq!(stats.out_of_order, 0);
    assert!(rb.is_empty());
}

#[test]
fn test_transfer_owned_strings() {
    const COUNT: usize = 200_000;
    let mut rb: RingBuffer<String, 256> = RingBuffer::new();
    let (mut tx, mut rx) = rb.split();

    thread::scope(|s| {
        s.spawn(move || {
            for i in 0..COUNT {
                let mut value = i.to_string();
                loop {
                    match tx.push(value) {
                        Ok(()) => break,
                        Err(full) => {
                            value = full.into_inner();
                            thread::yield_now();
                        }
                    }
                }
            }
        });

        let mut expected = 0usize;
        while expected < COUNT {
            if let Some(value) = rx.try_pop() {
                assert_eq!(value, expected.to_string());
                expected += 1;
            } else {
                thread::yield_now();
            }
        }
    });
}

#[test]
fn test_transfer_with_peek_and_bulk() {
    const COUNT: u64 = 500_000;
    let mut rb: RingBuffer<u64, 1024> = RingBuffer::new();
    let (mut tx, mut rx) = rb.split();

    thread::scope(|s| {
        s.spawn(move || {
            let mut next = 0u64;
            let mut chunk = Vec::with_capacity(64);
            while next < COUNT {
                chunk.clear();
                chunk.extend(next..(next + 64).min(COUNT));
                let pushed = tx.push_bulk(&chunk);
                next += pushed as u64;
                if pushed == 0 {
                    thread::yield_now();
                }
            }
        });

        let mut stats = TransferStats::new();
        let mut batch = [0u64; 100];
        let mut front = 0u64;
        while stats.received < COUNT {
            // Peek harus selalu melihat value berikutnya yang diharapkan
            if rx.peek(&mut front) {
                assert_eq!(front, stats.received);
            }
            let n = rx.pop_bulk(&mut batch, 100);
            for &value in &batch[..n] {
                stats.record(value);
            }
        }
        assert_eq!(stats.duplicates, 0);
        assert_eq!(stats.out_of_order, 0);
    });
}
