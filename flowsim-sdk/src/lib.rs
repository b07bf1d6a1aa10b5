//! # flowsim-sdk
//!
//! Simulates household water-flow sensors and publishes their readings to a
//! Prometheus Pushgateway.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowsim_sdk::{Output, Publisher};
//! use flowsim_sdk::prometheus::PushgatewayConfig;
//! use flowsim_types::Mode;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = PushgatewayConfig::builder()
//!         .endpoint("http://localhost:9091")
//!         .job("water_sensor_simulator")
//!         .build();
//!
//!     let publisher = Publisher::builder()
//!         .household("A101", Mode::Normal)
//!         .household("B202", Mode::SlowLeak)
//!         .household("C303", Mode::MajorLeak)
//!         .output(Output::pushgateway(gateway)?)
//!         .interval(Duration::from_secs(15))
//!         .build();
//!
//!     // Start background publishing (non-blocking)
//!     let handle = publisher.start();
//!
//!     // ... your application runs ...
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Flow model**: time-of-day usage for normal households, constant flow
//!   for slow and major leaks
//! - **Injectable randomness and clock**: seed a run or script exact draws
//! - **Multiple outputs**: Pushgateway, file, or custom channel
//! - **Self-healing loop**: a failed push is logged and retried next cycle

mod clock;
mod error;
mod output;
mod publisher;
mod random;

pub mod model;
pub mod prometheus;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, LocalClock};
pub use error::PushError;
pub use output::Output;
pub use publisher::{
    build_snapshot, CycleReport, Publisher, PublisherBuilder, PublisherHandle, PushOutcome,
    DEFAULT_INTERVAL,
};
pub use random::{RandomSource, RngSource, SequenceSource};

// Re-export types for convenience
pub use flowsim_types::{Household, Mode, Reading, Snapshot};
