//! The publisher loop: simulate, push, sleep, repeat.

use std::fmt;
use std::time::Duration;

use flowsim_types::{Household, Mode, Snapshot};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::clock::{Clock, LocalClock};
use crate::error::PushError;
use crate::model;
use crate::output::Output;
use crate::random::{RandomSource, RngSource};

/// Default pause between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Simulates every configured household once per cycle and publishes the
/// resulting snapshot to each output.
///
/// A cycle never fails as a whole. A push that fails is logged and the
/// publisher moves on; the next cycle pushes a fresh snapshot.
///
/// # Example
///
/// ```rust,no_run
/// use flowsim_sdk::{Output, Publisher};
/// use flowsim_sdk::prometheus::PushgatewayConfig;
/// use flowsim_types::Mode;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut publisher = Publisher::builder()
///         .household("A101", Mode::Normal)
///         .household("B202", Mode::SlowLeak)
///         .household("C303", Mode::MajorLeak)
///         .output(Output::pushgateway(PushgatewayConfig::default())?)
///         .interval(Duration::from_secs(15))
///         .build();
///
///     // Runs until the process is interrupted
///     publisher.run().await;
///     Ok(())
/// }
/// ```
pub struct Publisher {
    households: Vec<Household>,
    outputs: Vec<Output>,
    interval: Duration,
    rng: Box<dyn RandomSource + Send>,
    clock: Box<dyn Clock>,
    cycles: u64,
}

impl Publisher {
    /// Create a builder for configuring the publisher.
    pub fn builder() -> PublisherBuilder {
        PublisherBuilder::new()
    }

    /// The configured households, in configuration order.
    pub fn households(&self) -> &[Household] {
        &self.households
    }

    /// The configured outputs.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Pause between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Simulate every household at the given hour.
    pub fn sample(&mut self, hour: u32) -> Snapshot {
        build_snapshot(&self.households, hour, &mut self.rng)
    }

    /// Run a single cycle: read the clock, build a snapshot, push it to
    /// every output.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let hour = self.clock.current_hour();
        let snapshot = self.sample(hour);

        info!(cycle = self.cycles, hour, "--- Pushing metrics ---");
        for reading in snapshot.iter() {
            info!(
                "  {} ({}): {:.2} LPM",
                reading.household, reading.mode, reading.flow_lpm
            );
        }

        let mut outcomes = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            let target = output.target();
            let result = output.emit(&snapshot).await;
            match &result {
                Ok(()) => info!(endpoint = %target, "Push successful"),
                Err(e) => error!(
                    endpoint = %target,
                    error = %e,
                    "Failed to push metrics to {}. Is the collector running?",
                    target
                ),
            }
            outcomes.push(PushOutcome { target, result });
        }

        CycleReport {
            cycle: self.cycles,
            hour,
            snapshot,
            outcomes,
        }
    }

    /// Run cycles forever, sleeping for the interval after each one.
    ///
    /// This never returns; stop it by dropping the future or ending the
    /// process.
    pub async fn run(&mut self) {
        info!(
            households = self.households.len(),
            outputs = self.outputs.len(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting water flow publisher"
        );
        loop {
            self.run_cycle().await;
            debug!("sleeping for {:?}", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Start [`run`](Self::run) on a background tokio task.
    ///
    /// Returns a handle that can be used to stop it. Dropping the handle
    /// also stops the loop. A cycle in progress is abandoned.
    pub fn start(mut self) -> PublisherHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = self.run() => {}
                _ = stop_requested(&mut stop_rx) => {}
            }
            info!(cycles = self.cycles, "Publisher stopped");
            self
        });

        PublisherHandle { stop_tx, task }
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("households", &self.households)
            .field("outputs", &self.outputs)
            .field("interval", &self.interval)
            .field("cycles", &self.cycles)
            .finish()
    }
}

// Resolves on stop() or when the handle is dropped
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Simulate every household at the given hour into a fresh snapshot.
pub fn build_snapshot<R: RandomSource + ?Sized>(
    households: &[Household],
    hour: u32,
    rng: &mut R,
) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for household in households {
        let flow = model::compute_flow(household, hour, rng);
        snapshot.record(household.id.clone(), household.mode, flow);
    }
    snapshot
}

/// Builder for configuring a Publisher.
#[derive(Default)]
pub struct PublisherBuilder {
    households: Vec<Household>,
    outputs: Vec<Output>,
    interval: Option<Duration>,
    rng: Option<Box<dyn RandomSource + Send>>,
    clock: Option<Box<dyn Clock>>,
}

impl PublisherBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a household.
    pub fn household(mut self, id: impl Into<String>, mode: Mode) -> Self {
        self.households.push(Household::new(id, mode));
        self
    }

    /// Add several households, keeping their order.
    pub fn households(mut self, households: impl IntoIterator<Item = Household>) -> Self {
        self.households.extend(households);
        self
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; snapshots will be pushed to all of them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set the pause between cycles.
    ///
    /// Defaults to 15 seconds if not specified.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Use a specific random source.
    pub fn random_source(mut self, rng: impl RandomSource + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Use a seeded generator for a reproducible run.
    pub fn seed(self, seed: u64) -> Self {
        self.random_source(RngSource::seeded(seed))
    }

    /// Use a specific clock. Defaults to the local wall clock.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Build the publisher.
    pub fn build(self) -> Publisher {
        Publisher {
            households: self.households,
            outputs: self.outputs,
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            rng: self
                .rng
                .unwrap_or_else(|| Box::new(RngSource::from_entropy())),
            clock: self.clock.unwrap_or_else(|| Box::new(LocalClock)),
            cycles: 0,
        }
    }
}

impl fmt::Debug for PublisherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherBuilder")
            .field("households", &self.households)
            .field("outputs", &self.outputs)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Result of pushing one snapshot to one output.
#[derive(Debug)]
pub struct PushOutcome {
    /// Where the snapshot was sent.
    pub target: String,
    /// What happened.
    pub result: Result<(), PushError>,
}

/// Everything that happened in one cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Cycle number, starting at 1.
    pub cycle: u64,
    /// Hour of day the readings were simulated for.
    pub hour: u32,
    /// The snapshot that was published.
    pub snapshot: Snapshot,
    /// One outcome per output, in output order.
    pub outcomes: Vec<PushOutcome>,
}

impl CycleReport {
    /// Returns true if every output accepted the snapshot.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// The outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &PushOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Handle for controlling a publisher started with [`Publisher::start`].
///
/// Drop this handle to stop the loop, or call `stop()` explicitly.
#[derive(Debug)]
pub struct PublisherHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<Publisher>,
}

impl PublisherHandle {
    /// Signal the loop to stop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for it, returning the publisher.
    pub async fn shutdown(self) -> Result<Publisher, tokio::task::JoinError> {
        self.stop();
        self.task.await
    }
}
