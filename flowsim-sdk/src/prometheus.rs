//! Prometheus exposition format and Pushgateway delivery.
//!
//! Snapshots are rendered in the Prometheus text-based exposition format and
//! pushed to a Pushgateway, which Prometheus then scrapes. Each push replaces
//! every metric previously pushed under the same job.
//!
//! ## Example
//!
//! ```rust,no_run
//! use flowsim_sdk::prometheus::{PushgatewayClient, PushgatewayConfig};
//! use flowsim_sdk::Snapshot;
//! use flowsim_types::Mode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PushgatewayConfig::builder()
//!         .endpoint("http://localhost:9091")
//!         .job("water_sensor_simulator")
//!         .build();
//!
//!     let client = PushgatewayClient::new(config)?;
//!
//!     let snapshot = Snapshot::builder()
//!         .reading("C303", Mode::MajorLeak, 6.42)
//!         .build();
//!
//!     client.push(&snapshot).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use flowsim_types::Snapshot;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use crate::error::PushError;

/// Name of the flow-rate gauge.
pub const METRIC_NAME: &str = "household_water_flow_rate_lpm";

/// Help text of the flow-rate gauge.
pub const METRIC_HELP: &str = "Current water flow rate in liters per minute (LPM).";

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Default Pushgateway address.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9091";

/// Default job name.
pub const DEFAULT_JOB: &str = "water_sensor_simulator";

/// Default push timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for pushing to a Pushgateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PushgatewayConfig {
    /// Base URL of the gateway (e.g., "http://localhost:9091")
    pub endpoint: String,
    /// Job name the metrics are grouped under
    pub job: String,
    /// Optional namespace prefix for the metric name
    pub namespace: Option<String>,
    /// Timeout for a single push
    pub timeout: Duration,
}

impl Default for PushgatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            job: DEFAULT_JOB.to_string(),
            namespace: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PushgatewayConfig {
    /// Create a new builder for PushgatewayConfig.
    pub fn builder() -> PushgatewayConfigBuilder {
        PushgatewayConfigBuilder::default()
    }

    /// The full URL a push is sent to.
    pub fn push_url(&self) -> Result<Url, PushError> {
        pushgateway_url(&self.endpoint, &self.job)
    }
}

/// Builder for PushgatewayConfig.
#[derive(Debug, Default)]
pub struct PushgatewayConfigBuilder {
    endpoint: Option<String>,
    job: Option<String>,
    namespace: Option<String>,
    timeout: Option<Duration>,
}

impl PushgatewayConfigBuilder {
    /// Set the gateway base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the job name.
    pub fn job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Set the namespace prefix for the metric name.
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    /// Set the push timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the PushgatewayConfig.
    pub fn build(self) -> PushgatewayConfig {
        PushgatewayConfig {
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            job: self.job.unwrap_or_else(|| DEFAULT_JOB.to_string()),
            namespace: self.namespace,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Pushes snapshots to a Pushgateway over HTTP.
#[derive(Debug, Clone)]
pub struct PushgatewayClient {
    client: Client,
    config: PushgatewayConfig,
    url: Url,
}

impl PushgatewayClient {
    /// Create a client. Fails if the endpoint is unusable or the HTTP client
    /// cannot be built.
    pub fn new(config: PushgatewayConfig) -> Result<Self, PushError> {
        let url = config.push_url()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            url,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &PushgatewayConfig {
        &self.config
    }

    /// The URL pushes are sent to.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Push a snapshot, replacing the job's previous metrics.
    ///
    /// Any 2xx response is success.
    pub async fn push(&self, snapshot: &Snapshot) -> Result<(), PushError> {
        let body = format_prometheus(snapshot, self.config.namespace.as_deref());

        let response = self
            .client
            .put(self.url.clone())
            .header(CONTENT_TYPE, TEXT_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Build the push URL for a gateway endpoint and job.
///
/// An endpoint without a scheme is assumed to be plain `http://`. A job
/// containing `/` is sent in the `job@base64/<urlsafe base64>` form, and an
/// empty one as `job@base64/=`, the way the Prometheus client libraries do.
pub fn pushgateway_url(endpoint: &str, job: &str) -> Result<Url, PushError> {
    let endpoint = endpoint.trim();
    let invalid = |reason: String| PushError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let mut url = match Url::parse(endpoint) {
        Ok(url) if !url.cannot_be_a_base() => url,
        // "host:port" parses as a scheme with an opaque path
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("http://{}", endpoint)).map_err(|e| invalid(e.to_string()))?
        }
        Err(e) => return Err(invalid(e.to_string())),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }

    url.path_segments_mut()
        .map_err(|_| invalid("not a base URL".to_string()))?
        .pop_if_empty()
        .extend(["metrics"])
        .extend(job_segments(job));
    Ok(url)
}

fn job_segments(job: &str) -> [String; 2] {
    if job.is_empty() {
        ["job@base64".to_string(), "=".to_string()]
    } else if job.contains('/') {
        ["job@base64".to_string(), general_purpose::URL_SAFE.encode(job)]
    } else {
        ["job".to_string(), job.to_string()]
    }
}

/// Format a snapshot as Prometheus exposition format.
pub fn format_prometheus(snapshot: &Snapshot, namespace: Option<&str>) -> String {
    let mut output = String::new();
    let prefix = namespace.map(|n| format!("{}_", n)).unwrap_or_default();

    output.push_str(&format!("# HELP {}{} {}\n", prefix, METRIC_NAME, METRIC_HELP));
    output.push_str(&format!("# TYPE {}{} gauge\n", prefix, METRIC_NAME));

    for reading in snapshot.iter() {
        output.push_str(&format!(
            "{}{}{{household=\"{}\",mode=\"{}\"}} {:.2}\n",
            prefix,
            METRIC_NAME,
            escape_label_value(&reading.household),
            reading.mode.as_str(),
            reading.flow_lpm
        ));
    }

    output
}

/// Escape a label value for Prometheus format.
/// Backslash, double-quote, and newline must be escaped.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use flowsim_types::Mode;

    fn create_test_snapshot() -> Snapshot {
        Snapshot::builder()
            .timestamp_ms(1703160000000)
            .reading("A101", Mode::Normal, 0.0)
            .reading("B202", Mode::SlowLeak, 0.12)
            .reading("C303", Mode::MajorLeak, 6.5)
            .build()
    }

    #[test]
    fn test_format_prometheus_basic() {
        let output = format_prometheus(&create_test_snapshot(), None);

        assert!(output.contains(
            "household_water_flow_rate_lpm{household=\"A101\",mode=\"NORMAL\"} 0.00"
        ));
        assert!(output.contains(
            "household_water_flow_rate_lpm{household=\"B202\",mode=\"SLOW_LEAK\"} 0.12"
        ));
        assert!(output.contains(
            "household_water_flow_rate_lpm{household=\"C303\",mode=\"MAJOR_LEAK\"} 6.50"
        ));
    }

    #[test]
    fn test_format_includes_help_and_type() {
        let output = format_prometheus(&create_test_snapshot(), None);
        let mut lines = output.lines();

        assert_eq!(
            lines.next(),
            Some(
                "# HELP household_water_flow_rate_lpm Current water flow rate in liters per minute (LPM)."
            )
        );
        assert_eq!(lines.next(), Some("# TYPE household_water_flow_rate_lpm gauge"));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_format_prometheus_with_namespace() {
        let output = format_prometheus(&create_test_snapshot(), Some("flowsim"));

        assert!(output.contains("# HELP flowsim_household_water_flow_rate_lpm"));
        assert!(output.contains("# TYPE flowsim_household_water_flow_rate_lpm gauge"));
        assert!(output.contains("flowsim_household_water_flow_rate_lpm{household=\"A101\""));
    }

    #[test]
    fn test_empty_snapshot() {
        let output = format_prometheus(&Snapshot::with_timestamp(0), None);
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("# HELP"));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_household_label_is_escaped() {
        let snapshot = Snapshot::builder()
            .reading("flat \"7\"", Mode::Normal, 1.0)
            .build();
        let output = format_prometheus(&snapshot, None);
        assert!(output.contains("household=\"flat \\\"7\\\"\""));
    }

    fn url_for(endpoint: &str, job: &str) -> String {
        pushgateway_url(endpoint, job).unwrap().to_string()
    }

    #[test]
    fn test_pushgateway_url() {
        assert_eq!(
            url_for("http://localhost:9091", "water_sensor_simulator"),
            "http://localhost:9091/metrics/job/water_sensor_simulator"
        );
        assert_eq!(url_for("http://gw:9091/", "job"), "http://gw:9091/metrics/job/job");
        assert_eq!(url_for("10.0.0.5:9091", "job"), "http://10.0.0.5:9091/metrics/job/job");
        assert_eq!(url_for("gw:9091", "job"), "http://gw:9091/metrics/job/job");
        assert_eq!(
            url_for("https://gw.example/push/", "sim"),
            "https://gw.example/push/metrics/job/sim"
        );
        assert_eq!(
            url_for("https://gw.example", "water sensors"),
            "https://gw.example/metrics/job/water%20sensors"
        );
    }

    #[test]
    fn test_pushgateway_url_job_with_slash_uses_base64() {
        assert_eq!(url_for("gw:9091", "a/b"), "http://gw:9091/metrics/job@base64/YS9i");
        assert_eq!(
            url_for("http://gw:9091", "sensors/east"),
            "http://gw:9091/metrics/job@base64/c2Vuc29ycy9lYXN0"
        );
        assert_eq!(url_for("http://gw:9091", ""), "http://gw:9091/metrics/job@base64/=");
    }

    #[test]
    fn test_pushgateway_url_rejects_bad_endpoints() {
        let err = pushgateway_url("ftp://gw:21", "sim").unwrap_err();
        assert!(matches!(err, PushError::InvalidEndpoint { .. }));
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));

        assert!(pushgateway_url("", "sim").is_err());
        assert!(pushgateway_url("http://", "sim").is_err());
    }

    #[test]
    fn test_pushgateway_config_builder() {
        let config = PushgatewayConfig::builder()
            .endpoint("http://gateway:9091")
            .job("sim")
            .namespace("flowsim")
            .timeout(Duration::from_secs(3))
            .build();

        assert_eq!(config.endpoint, "http://gateway:9091");
        assert_eq!(config.job, "sim");
        assert_eq!(config.namespace, Some("flowsim".to_string()));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(
            config.push_url().unwrap().as_str(),
            "http://gateway:9091/metrics/job/sim"
        );
    }

    #[test]
    fn test_pushgateway_config_defaults() {
        let config = PushgatewayConfig::default();

        assert_eq!(config.endpoint, "http://localhost:9091");
        assert_eq!(config.job, "water_sensor_simulator");
        assert_eq!(config.namespace, None);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config, PushgatewayConfig::builder().build());
    }

    #[tokio::test]
    async fn test_push_sends_exposition_body() {
        let (addr, server) = testing::serve("200 OK", 1).await;
        let config = PushgatewayConfig::builder()
            .endpoint(format!("http://{}", addr))
            .job("water_sensor_simulator")
            .build();
        let client = PushgatewayClient::new(config).unwrap();
        assert_eq!(client.config().job, "water_sensor_simulator");
        assert_eq!(client.config().timeout, DEFAULT_TIMEOUT);

        client.push(&create_test_snapshot()).await.unwrap();

        let requests = server.await.unwrap();
        let request = &requests[0];
        assert!(request
            .request_line
            .starts_with("PUT /metrics/job/water_sensor_simulator "));
        assert_eq!(request.header("content-type"), Some(TEXT_CONTENT_TYPE));
        assert!(request.body.contains("household=\"C303\",mode=\"MAJOR_LEAK\"} 6.50"));
    }

    #[tokio::test]
    async fn test_push_accepts_202() {
        let (addr, server) = testing::serve("202 Accepted", 1).await;
        let config = PushgatewayConfig::builder()
            .endpoint(format!("http://{}", addr))
            .build();
        let client = PushgatewayClient::new(config).unwrap();

        assert!(client.push(&create_test_snapshot()).await.is_ok());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_push_reports_error_status() {
        let (addr, server) = testing::serve("500 Internal Server Error", 1).await;
        let config = PushgatewayConfig::builder()
            .endpoint(format!("http://{}", addr))
            .build();
        let client = PushgatewayClient::new(config).unwrap();

        let err = client.push(&create_test_snapshot()).await.unwrap_err();
        assert!(matches!(err, PushError::Status { status: 500, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_push_to_unreachable_gateway_fails() {
        let addr = testing::unused_addr().await;
        let config = PushgatewayConfig::builder()
            .endpoint(format!("http://{}", addr))
            .timeout(Duration::from_secs(2))
            .build();
        let client = PushgatewayClient::new(config).unwrap();

        let err = client.push(&create_test_snapshot()).await.unwrap_err();
        assert!(err.is_connectivity(), "unexpected error: {:?}", err);
    }
}
