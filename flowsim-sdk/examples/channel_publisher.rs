//! Example: Consuming snapshots via a channel
//!
//! This example demonstrates how to embed the publisher in your own
//! application and receive each cycle's snapshot through a channel instead
//! of pushing it to a Pushgateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p flowsim-sdk --example channel_publisher
//! ```

use std::time::Duration;

use flowsim_sdk::{Mode, Output, Publisher};

#[tokio::main]
async fn main() {
    println!("Channel publisher example");
    println!("Simulating three households every 2 seconds...\n");

    let (output, mut rx) = Output::channel(16);

    let handle = Publisher::builder()
        .household("A101", Mode::Normal)
        .household("B202", Mode::SlowLeak)
        .household("C303", Mode::MajorLeak)
        .output(output)
        .interval(Duration::from_secs(2))
        .build()
        .start();

    for _ in 0..5 {
        let Some(snapshot) = rx.recv().await else {
            break;
        };
        println!("Snapshot at {} ms:", snapshot.timestamp_ms);
        for reading in snapshot.iter() {
            let marker = if reading.mode.is_leak() { " (leak)" } else { "" };
            println!(
                "  {:<6} {:<10} {:>6.2} LPM{}",
                reading.household, reading.mode.as_str(), reading.flow_lpm, marker
            );
        }
        println!("  total: {:.2} LPM\n", snapshot.total_flow_lpm());
    }

    if let Err(e) = handle.shutdown().await {
        eprintln!("publisher task failed: {}", e);
    }
}
