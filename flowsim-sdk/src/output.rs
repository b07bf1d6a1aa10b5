//! Output backends for publishing snapshots.

use std::path::PathBuf;

use flowsim_types::Snapshot;

use crate::error::PushError;
use crate::prometheus::{format_prometheus, PushgatewayClient, PushgatewayConfig};

/// Output destination for snapshots.
///
/// Configure where the publisher should send each cycle's snapshot.
#[derive(Debug)]
pub enum Output {
    /// Push snapshots to a Prometheus Pushgateway.
    ///
    /// Use `Output::pushgateway()` to create this variant.
    Pushgateway(PushgatewayClient),

    /// Write snapshots to a file.
    ///
    /// The file is overwritten with each snapshot. Paths ending in `.prom`
    /// get the Prometheus text format; anything else gets JSON.
    File(PathBuf),

    /// Send snapshots through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(tokio::sync::mpsc::Sender<Snapshot>),
}

impl Output {
    /// Create a Pushgateway output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowsim_sdk::Output;
    /// use flowsim_sdk::prometheus::PushgatewayConfig;
    ///
    /// let config = PushgatewayConfig::builder()
    ///     .endpoint("http://localhost:9091")
    ///     .build();
    ///
    /// let output = Output::pushgateway(config).expect("HTTP client");
    /// ```
    pub fn pushgateway(config: PushgatewayConfig) -> Result<Self, PushError> {
        Ok(Output::Pushgateway(PushgatewayClient::new(config)?))
    }

    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowsim_sdk::Output;
    ///
    /// let output = Output::file("flow.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// This is useful for integrating with your own snapshot handling.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowsim_sdk::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive snapshots
    /// // while let Some(snapshot) = rx.recv().await {
    /// //     println!("Got snapshot with {} readings", snapshot.len());
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<Snapshot>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Human-readable destination, used in log lines.
    pub fn target(&self) -> String {
        match self {
            Output::Pushgateway(client) => client.url().to_string(),
            Output::File(path) => path.display().to_string(),
            Output::Channel(_) => "channel".to_string(),
        }
    }

    /// Emit a snapshot to this output.
    pub(crate) async fn emit(&self, snapshot: &Snapshot) -> Result<(), PushError> {
        match self {
            Output::Pushgateway(client) => {
                client.push(snapshot).await?;
            }
            Output::File(path) => {
                let is_prom = path.extension().and_then(|ext| ext.to_str()) == Some("prom");
                let contents = if is_prom {
                    format_prometheus(snapshot, None)
                } else {
                    serde_json::to_string_pretty(snapshot)?
                };
                tokio::fs::write(path, contents).await?;
            }
            Output::Channel(tx) => {
                // Best effort send (don't block if channel is full)
                let _ = tx.try_send(snapshot.clone());
            }
        }
        Ok(())
    }
}
