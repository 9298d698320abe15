use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing. With a log file, events go there so the alternate
/// screen stays clean; without one, logging is a no-op. The filter comes
/// from `GAZEL_LOG` (falling back to `RUST_LOG` conventions via EnvFilter).
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))?;

    let filter = EnvFilter::try_from_env("GAZEL_LOG").unwrap_or_else(|_| "gazel=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
