//! # Metrics Registry
//!
//! Prometheus metrics registry setup, registration and textfile output.

use anyhow::{Context, Result};
use prometheus::{Encoder, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;

/// Global Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register all metrics with the Prometheus registry
///
/// Registering twice fails with `AlreadyReg`, so the binary calls this once.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    super::run_metrics::register_run_metrics()?;
    Ok(())
}

/// Render every registered metric in the text exposition format
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

/// Write the textfile a node exporter or CI step picks up
///
/// The file is written next to its final path and renamed so a collector
/// never reads a partial file.
pub fn write_textfile(path: &Path) -> Result<()> {
    let text = gather_text()?;
    let staging = path.with_extension("prom.tmp");
    std::fs::write(&staging, text)
        .with_context(|| format!("Failed to write metrics to {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("Failed to move metrics into {}", path.display()))?;
    Ok(())
}
