//! SPSC Demo - producer/consumer kecil dengan output ke console
//!
//! Usage:
//!   cargo run --bin spsc_demo -- [OPTIONS]

use std::thread;

use clap::Parser;
use log::info;

use spsc_ring::RingBuffer;

/// Demo configuration
#[derive(Parser, Debug)]
#[command(
    name = "spsc_demo",
    about = "Small producer/consumer demo for the SPSC ring buffer"
)]
struct DemoConfig {
    /// Jumlah value yang dikirim
    #[arg(
        short,
        long,
        default_value_t = 10_000,
        value_parser = clap::value_parser!(i32).range(0..)
    )]
    count: i32,

    /// Log setiap value kelipatan ini
    #[arg(
        short,
        long,
        default_value_t = 2_500,
        value_parser = clap::value_parser!(i32).range(1..)
    )]
    report_every: i32,
}

fn run_demo(config: &DemoConfig) -> anyhow::Result<usize> {
    let count = config.count;
    let report_every = config.report_every;

    let mut queue: RingBuffer<i32, 1024> = RingBuffer::new();
    let (mut tx, mut rx) = queue.split();

    let received = thread::scope(|s| {
        s.spawn(move || {
            for i in 0..count {
                while !tx.emplace(|| i) {
                    thread::yield_now();
                }
            }
        });

        let consumer = s.spawn(move || {
            let mut value = 0;
            let mut received = 0usize;
            while received < count as usize {
                if rx.pop(&mut value) {
                    if value % report_every == 0 {
                        info!("got {}", value);
                    }
                    received += 1;
                } else {
                    thread::yield_now();
                }
            }
            received
        });

        consumer
            .join()
            .map_err(|_| anyhow::anyhow!("consumer thread panicked"))
    })?;

    Ok(received)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DemoConfig::parse();
    let received = run_demo(&config)?;
    info!("received {} values", received);
    println!("done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_count() {
        assert!(DemoConfig::try_parse_from(["spsc_demo", "--count=-5"]).is_err());
    }

    #[test]
    fn test_rejects_zero_report_interval() {
        assert!(DemoConfig::try_parse_from(["spsc_demo", "--report-every", "0"]).is_err());
    }

    #[test]
    fn test_defaults_and_run() {
        let config = DemoConfig::try_parse_from(["spsc_demo", "--count", "3000"]).unwrap();
        assert_eq!(config.report_every, 2_500);
        assert_eq!(run_demo(&config).unwrap(), 3000);
    }

    #[test]
    fn test_zero_count_is_allowed() {
        let config = DemoConfig::try_parse_from(["spsc_demo", "--count", "0"]).unwrap();
        assert_eq!(run_demo(&config).unwrap(), 0);
    }
}
