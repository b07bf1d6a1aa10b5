use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flowsim_sdk::{Household, Output, Publisher};
use tracing::info;

mod logging;
mod settings;

use settings::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "flowsim")]
#[command(about = "Simulate household water-flow sensors and push readings to a Prometheus Pushgateway")]
struct Args {
    /// Path to a config file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pushgateway base URL (e.g., http://localhost:9091)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Job name to group pushed metrics under
    #[arg(short, long)]
    job: Option<String>,

    /// Seconds between pushes
    #[arg(short, long)]
    interval: Option<u64>,

    /// Seconds before a push is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    /// Household to simulate as ID=MODE (repeatable; replaces configured households)
    #[arg(long = "household", value_name = "ID=MODE", value_parser = parse_household)]
    households: Vec<Household>,

    /// Seed the random generator for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Prefix for the metric name
    #[arg(long)]
    namespace: Option<String>,

    /// Also write each snapshot to this file (.prom for text format, JSON otherwise)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Log filter (e.g., "debug", "flowsim_sdk=debug"); defaults to RUST_LOG or "info"
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            job: self.job.clone(),
            interval_secs: self.interval,
            timeout_secs: self.timeout,
            seed: self.seed,
            namespace: self.namespace.clone(),
            output_file: self.output_file.clone(),
            households: self.households.clone(),
        }
    }
}

fn parse_household(arg: &str) -> Result<Household, String> {
    settings::parse_household(arg).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_level.as_deref())?;

    let settings = Settings::load(args.config.as_deref())?.with_overrides(args.overrides());
    let households = settings.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings, households, args.once))
}

async fn run(settings: Settings, households: Vec<Household>, once: bool) -> Result<()> {
    let mut publisher = build_publisher(&settings, households)?;

    info!(
        "Starting Water Sensor Simulator. Pushing to: {}",
        settings.pushgateway().push_url()?
    );
    let running: Vec<String> = publisher.households().iter().map(|h| h.to_string()).collect();
    info!("Households running: {}", running.join(", "));

    if once {
        let report = publisher.run_cycle().await;
        if !report.all_succeeded() {
            bail!("{} of {} pushes failed", report.failures().count(), report.outcomes.len());
        }
        return Ok(());
    }

    info!("Press Ctrl+C to stop.");
    publisher.run().await;
    Ok(())
}

fn build_publisher(settings: &Settings, households: Vec<Household>) -> Result<Publisher> {
    let gateway = Output::pushgateway(settings.pushgateway())
        .context("failed to create Pushgateway client")?;

    let mut builder = Publisher::builder()
        .households(households)
        .output(gateway)
        .interval(settings.interval());

    if let Some(path) = &settings.output_file {
        builder = builder.output(Output::file(path));
    }
    if let Some(seed) = settings.seed {
        builder = builder.seed(seed);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsim_sdk::Mode;
    use std::time::Duration;

    fn base_args() -> Args {
        Args::parse_from(["flowsim"])
    }

    #[test]
    fn test_args_defaults() {
        let args = base_args();
        assert!(args.config.is_none());
        assert!(args.households.is_empty());
        assert!(!args.once);
        assert_eq!(args.overrides(), Overrides::default());
    }

    #[test]
    fn test_args_households() {
        let args = Args::parse_from([
            "flowsim",
            "--household",
            "A101=NORMAL",
            "--household",
            "C303=major_leak",
            "--interval",
            "30",
        ]);

        let overrides = args.overrides();
        assert_eq!(
            overrides.households,
            vec![
                Household::new("A101", Mode::Normal),
                Household::new("C303", Mode::MajorLeak),
            ]
        );
        assert_eq!(overrides.interval_secs, Some(30));
    }

    #[test]
    fn test_args_reject_bad_household() {
        let result = Args::try_parse_from(["flowsim", "--household", "A101=GEYSER"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_publisher_from_settings() {
        let mut settings = Settings::default();
        settings.interval_secs = 2;
        settings.output_file = Some(PathBuf::from("flow.prom"));
        settings.seed = Some(5);
        let households = settings.validate().unwrap();

        let publisher = build_publisher(&settings, households).unwrap();
        assert_eq!(publisher.households().len(), 3);
        assert_eq!(publisher.outputs().len(), 2);
        assert_eq!(publisher.interval(), Duration::from_secs(2));
        assert_eq!(
            publisher.outputs()[0].target(),
            "http://localhost:9091/metrics/job/water_sensor_simulator"
        );
    }

    #[tokio::test]
    async fn test_run_once_fails_when_push_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        // Nothing listens on port 1
        settings.endpoint = "http://127.0.0.1:1".to_string();
        settings.timeout_secs = 2;
        settings.output_file = Some(dir.path().join("flow.json"));
        let households = settings.validate().unwrap();

        let err = run(settings, households, true).await.unwrap_err();
        assert!(err.to_string().contains("1 of 2 pushes failed"));
        assert!(dir.path().join("flow.json").exists());
    }

    #[tokio::test]
    async fn test_run_keeps_going_until_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.endpoint = "http://127.0.0.1:1".to_string();
        settings.timeout_secs = 1;
        settings.interval_secs = 60;
        settings.output_file = Some(dir.path().join("flow.json"));
        let households = settings.validate().unwrap();

        // A failed push neither ends the loop nor returns an error
        let result = tokio::time::timeout(
            Duration::from_secs(3),
            run(settings, households, false),
        )
        .await;
        assert!(result.is_err(), "run() returned: {:?}", result);
        assert!(dir.path().join("flow.json").exists());
    }
}
