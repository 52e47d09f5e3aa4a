//! Command line configuration and logging setup.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::DEFAULT_BASE_URL;

/// Terminal client for the entity API, with a points scroll demo
#[derive(Debug, Clone, Parser)]
#[command(name = "entity-console", version, about)]
pub struct Cli {
    /// Base URL of the entity API
    #[arg(env = "ENTITY_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Number of points generated by the scroll demo
    #[arg(long, default_value_t = 30)]
    pub points: u32,

    /// Append logs to this file. Without it nothing is logged, since stdout
    /// belongs to the terminal UI.
    #[arg(long, env = "ENTITY_CONSOLE_LOG")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Install the tracing subscriber. Filtering follows `RUST_LOG`, default `info`.
pub fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        std::env::remove_var("ENTITY_API_URL");
        std::env::remove_var("ENTITY_CONSOLE_LOG");

        let cli = Cli::try_parse_from(["entity-console"]).unwrap();
        assert_eq!(cli.api_url, DEFAULT_BASE_URL);
        assert_eq!(cli.log_file, None);
        assert_eq!(cli.timeout_secs, 30);
        assert_eq!(cli.points, 30);
        assert_eq!(cli.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_arguments() {
        let cli = Cli::try_parse_from([
            "entity-console",
            "http://api.test:9000",
            "--timeout-secs",
            "0",
            "--points",
            "12",
        ])
        .unwrap();
        assert_eq!(cli.api_url, "http://api.test:9000");
        assert_eq!(cli.points, 12);
        assert_eq!(cli.timeout(), Duration::from_secs(1));
    }
}
