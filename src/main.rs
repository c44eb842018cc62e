//! # csi-e2e
//!
//! Runs the Secrets Store CSI driver GCP provider end-to-end suites.
//!
//! ## Usage
//!
//! ```bash
//! # Run every suite (configuration comes from the environment)
//! PROJECT_ID=my-project LOCATION_ID=us-central1 GCP_PROVIDER_SHA=3f2c1ab \
//! SECRET_STORE_VERSION=v1.4.7 GKE_VERSION=STABLE csi-e2e
//!
//! # Run one suite and write Prometheus metrics for CI
//! csi-e2e --suite parametermanager --metrics-file /tmp/e2e.prom
//!
//! # Show what would run
//! csi-e2e --list
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use secrets_store_csi_e2e::cluster::ClusterProvisioner;
use secrets_store_csi_e2e::constants::DEFAULT_LOG_FILTER;
use secrets_store_csi_e2e::exec::{ensure_tools, CommandRunner, SystemRunner};
use secrets_store_csi_e2e::observability::metrics;
use secrets_store_csi_e2e::suites::SuiteSelection;
use secrets_store_csi_e2e::{Coordinator, E2eConfig, Fixture};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// Secrets Store CSI driver GCP provider e2e runner
#[derive(Parser)]
#[command(name = "csi-e2e")]
#[command(about = "Secrets Store CSI driver GCP provider end-to-end tests", long_about = None)]
struct Cli {
    /// Suite to run (overrides E2E_TEST_SUITE)
    #[arg(short, long, value_enum)]
    suite: Option<SuiteSelection>,

    /// Write Prometheus metrics to this file (overrides E2E_METRICS_FILE)
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Print the tests the selection would run and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    if cli.list {
        let selection = match cli.suite {
            Some(selection) => selection,
            None => std::env::var("E2E_TEST_SUITE")
                .unwrap_or_default()
                .parse()
                .map_err(anyhow::Error::msg)?,
        };
        list_tests(selection);
        return Ok(ExitCode::SUCCESS);
    }

    let mut config =
        E2eConfig::from_env().context("Failed to load configuration from the environment")?;
    if let Some(suite) = cli.suite {
        config.suite = suite;
    }
    if cli.metrics_file.is_some() {
        config.metrics_file = cli.metrics_file;
    }

    ensure_tools(&["gcloud", "kubectl"])?;
    metrics::register_metrics()?;

    info!(
        "running suite selection `{}` against project {}",
        config.suite, config.project_id
    );
    let suites = config.suite.suites();
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let mut fixture = Fixture::new(config, runner).context("Failed to create the run fixture")?;

    let report = Coordinator::new()
        .run(&mut fixture, &ClusterProvisioner, &suites)
        .await;
    report.log_summary();

    if let Some(path) = &fixture.config.metrics_file {
        match metrics::write_textfile(path) {
            Ok(()) => info!("wrote metrics to {}", path.display()),
            Err(e) => warn!("failed to write metrics to {}: {:#}", path.display(), e),
        }
    }

    Ok(report.exit_code())
}

fn list_tests(selection: SuiteSelection) {
    for suite in selection.suites() {
        for test in suite.tests() {
            println!("{}::{}", suite.name(), test.name);
        }
    }
}
