//! SPSC Throughput Benchmark
//!
//! Satu thread producer push `u64` berurutan, satu thread consumer pop
//! sampai semua diterima. Urutan diverifikasi di sisi consumer.
//!
//! Usage:
//!   cargo run --release --bin spsc_bench -- [OPTIONS]

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};

use spsc_ring::RingBuffer;

const RING_SLOTS: usize = 1 << 14;

/// Benchmark configuration
#[derive(Parser, Debug)]
#[command(
    name = "spsc_bench",
    about = "Two-thread throughput benchmark for the SPSC ring buffer"
)]
struct BenchConfig {
    /// Jumlah value yang ditransfer per round
    #[arg(short, long, default_value_t = 5_000_000)]
    count: u64,

    /// Jumlah round
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,

    /// Ukuran batch consumer; 1 berarti pop satu per satu
    #[arg(short, long, default_value_t = 1)]
    batch: usize,

    /// Pin producer ke CPU 0 dan consumer ke CPU 1 (Linux)
    #[arg(long)]
    pin: bool,
}

/// Hasil satu round
struct RoundStats {
    received: u64,
    producer_retries: u64,
    consumer_misses: u64,
    out_of_order: u64,
    elapsed: Duration,
}

impl RoundStats {
    fn mops(&self) -> f64 {
        self.received as f64 / self.elapsed.as_secs_f64() / 1_000_000.0
    }

    fn print_report(&self, round: u32) {
        println!("\n📊 Round {} ", round);
        println!("   Transferred:     {}", self.received);
        println!("   Elapsed:         {} ms", self.elapsed.as_millis());
        println!("   Throughput:      {:.2} Mops", self.mops());
        println!("   Producer retries: {}", self.producer_retries);
        println!("   Consumer misses:  {}", self.consumer_misses);
        if self.out_of_order > 0 {
            println!("   Out of order:    {} ⚠️", self.out_of_order);
        }
    }
}

#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> std::io::Result<()> {
    // SAFETY: cpu_set_t adalah plain bitmask; pid 0 = thread pemanggil.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(cpu, &mut set);
        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn pin_to_cpu(_cpu: usize) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "thread pinning is only supported on Linux",
    ))
}

fn pin_or_warn(enabled: bool, cpu: usize, role: &str) {
    if !enabled {
        return;
    }
    match pin_to_cpu(cpu) {
        Ok(()) => info!("{} pinned to cpu {}", role, cpu),
        Err(e) => warn!("failed to pin {} to cpu {}: {}", role, cpu, e),
    }
}

fn run_round(
    config: &BenchConfig,
    ring: &mut RingBuffer<u64, RING_SLOTS>,
) -> anyhow::Result<RoundStats> {
    let count = config.count;
    let batch = config.batch.max(1);
    let pin = config.pin;
    let (mut tx, mut rx) = ring.split();

    let start = Instant::now();
    let (producer_retries, (received, consumer_misses, out_of_order)) = thread::scope(|s| {
        let producer = s.spawn(move || {
            pin_or_warn(pin, 0, "producer");
            let mut retries = 0u64;
            for i in 0..count {
                while !tx.emplace(|| i) {
                    retries += 1;
                    thread::yield_now();
                }
            }
            retries
        });

        let consumer = s.spawn(move || {
            pin_or_warn(pin, 1, "consumer");
            let mut expected = 0u64;
            let mut misses = 0u64;
            let mut out_of_order = 0u64;
            let mut scratch = vec![0u64; batch];

            while expected < count {
                let n = if batch == 1 {
                    usize::from(rx.pop(&mut scratch[0]))
                } else {
                    rx.pop_bulk(&mut scratch, batch)
                };
                if n == 0 {
                    misses += 1;
                    std::hint::spin_loop();
                    continue;
                }
                for &value in &scratch[..n] {
                    if value != expected {
                        out_of_order += 1;
                    }
                    expected += 1;
                }
            }
            (expected, misses, out_of_order)
        });

        let retries = producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
        let consumed = consumer
            .join()
            .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
        Ok::<_, anyhow::Error>((retries, consumed))
    })?;
    let elapsed = start.elapsed();

    Ok(RoundStats {
        received,
        producer_retries,
        consumer_misses,
        out_of_order,
        elapsed,
    })
}

fn run_bench(config: BenchConfig) -> anyhow::Result<()> {
    println!("🚀 SPSC Ring Buffer Throughput");
    println!("==============================");
    info!(
        "slots={} count={} rounds={} batch={} pin={}",
        RING_SLOTS, config.count, config.rounds, config.batch, config.pin
    );

    let mut ring: RingBuffer<u64, RING_SLOTS> = RingBuffer::new();
    let mut best = 0.0f64;

    for round in 1..=config.rounds {
        let stats = run_round(&config, &mut ring).with_context(|| format!("round {}", round))?;
        stats.print_report(round);

        if stats.out_of_order > 0 {
            bail!(
                "round {}: {} values received out of order",
                round,
                stats.out_of_order
            );
        }
        if !ring.is_empty() {
            bail!("round {}: {} values left in the ring", round, ring.len());
        }
        best = best.max(stats.mops());
    }

    println!("\n✅ Best throughput: {:.2} Mops", best);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BenchConfig::parse();
    run_bench(config)
}
