//! Startup configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional config file (`--config`, TOML/YAML/JSON by extension)
//! 3. `FLOWSIM_*` environment variables (e.g. `FLOWSIM_ENDPOINT`,
//!    `FLOWSIM_INTERVAL_SECS`)
//! 4. command-line flags
//!
//! ```toml
//! endpoint = "http://localhost:9091"
//! job = "water_sensor_simulator"
//! interval_secs = 15
//!
//! [[households]]
//! id = "A101"
//! mode = "NORMAL"
//!
//! [[households]]
//! id = "B202"
//! mode = "SLOW_LEAK"
//! ```
//!
//! Nothing here is reloaded once the publisher is running.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File};
use flowsim_sdk::prometheus::{PushgatewayConfig, DEFAULT_ENDPOINT, DEFAULT_JOB};
use flowsim_sdk::{Household, Mode};
use serde::Deserialize;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "FLOWSIM";

/// A household as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HouseholdEntry {
    /// Household identifier.
    pub id: String,
    /// Mode name, e.g. "SLOW_LEAK".
    pub mode: String,
}

impl HouseholdEntry {
    fn new(id: &str, mode: Mode) -> Self {
        Self {
            id: id.to_string(),
            mode: mode.as_str().to_string(),
        }
    }
}

/// Everything the publisher needs at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pushgateway base URL.
    pub endpoint: String,
    /// Job name metrics are grouped under.
    pub job: String,
    /// Seconds between cycles.
    pub interval_secs: u64,
    /// Seconds before a push is abandoned.
    pub timeout_secs: u64,
    /// Seed for a reproducible run.
    pub seed: Option<u64>,
    /// Prefix for the metric name.
    pub namespace: Option<String>,
    /// Also write each snapshot to this file.
    pub output_file: Option<PathBuf>,
    /// Households to simulate, in order.
    pub households: Vec<HouseholdEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            job: DEFAULT_JOB.to_string(),
            interval_secs: 15,
            timeout_secs: 10,
            seed: None,
            namespace: None,
            output_file: None,
            households: vec![
                HouseholdEntry::new("A101", Mode::Normal),
                HouseholdEntry::new("B202", Mode::SlowLeak),
                HouseholdEntry::new("C303", Mode::MajorLeak),
            ],
        }
    }
}

/// Values given on the command line. `None` leaves the setting alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub job: Option<String>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub seed: Option<u64>,
    pub namespace: Option<String>,
    pub output_file: Option<PathBuf>,
    /// When non-empty, replaces the configured households entirely.
    pub households: Vec<Household>,
}

impl Settings {
    /// Load settings from an optional file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load settings, reading environment overrides from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config = builder.build().with_context(|| match path {
            Some(p) => format!("failed to load configuration from {}", p.display()),
            None => "failed to load configuration".to_string(),
        })?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Apply command-line overrides on top of the loaded settings.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(job) = overrides.job {
            self.job = job;
        }
        if let Some(interval) = overrides.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        if overrides.namespace.is_some() {
            self.namespace = overrides.namespace;
        }
        if overrides.output_file.is_some() {
            self.output_file = overrides.output_file;
        }
        if !overrides.households.is_empty() {
            self.households = overrides
                .households
                .into_iter()
                .map(|h| HouseholdEntry {
                    id: h.id,
                    mode: h.mode.as_str().to_string(),
                })
                .collect();
        }
        self
    }

    /// Check the settings and resolve the household list.
    pub fn validate(&self) -> Result<Vec<Household>> {
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        if self.job.trim().is_empty() {
            bail!("job name must not be empty");
        }
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        self.pushgateway().push_url()?;

        if self.households.is_empty() {
            bail!("at least one household must be configured");
        }

        let mut seen = HashSet::new();
        let mut households = Vec::with_capacity(self.households.len());
        for entry in &self.households {
            let id = entry.id.trim();
            if id.is_empty() {
                bail!("household id must not be empty");
            }
            if !seen.insert(id.to_string()) {
                bail!("household '{}' is configured more than once", id);
            }
            let mode: Mode = entry
                .mode
                .parse()
                .with_context(|| format!("household '{}'", id))?;
            households.push(Household::new(id, mode));
        }

        Ok(households)
    }

    /// Pause between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Pushgateway settings for the SDK.
    pub fn pushgateway(&self) -> PushgatewayConfig {
        let mut builder = PushgatewayConfig::builder()
            .endpoint(self.endpoint.trim())
            .job(self.job.trim())
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(ns) = &self.namespace {
            builder = builder.namespace(ns.clone());
        }
        builder.build()
    }
}

/// Parse a `ID=MODE` household argument.
pub fn parse_household(arg: &str) -> Result<Household> {
    let (id, mode) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected ID=MODE, got '{}'", arg))?;
    let id = id.trim();
    if id.is_empty() {
        bail!("household id must not be empty in '{}'", arg);
    }
    let mode: Mode = mode.parse()?;
    Ok(Household::new(id, mode))
}
