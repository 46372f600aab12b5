//! Logging initialization.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
///
/// Logs go to stderr so the terminal client can keep stdout for answers.
pub fn init_telemetry(log_level: &str, json_logs: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(parse_log_level(log_level).as_str()))
        .context("Failed to create environment filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
            .context("Failed to install JSON subscriber")?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to install subscriber")?;
    }

    Ok(())
}

/// Unknown names fall back to `INFO`.
pub fn parse_log_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
