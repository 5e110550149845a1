//! Tracing setup for the binaries.
//!
//! Logs go to stderr so tool output on stdout stays machine-readable.
//! `RUST_LOG` wins over the configured level; each `-v` raises the level
//! one step above it.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Filter directive for the configured level raised by `verbosity` steps.
pub fn effective_level(configured: &str, verbosity: u8) -> String {
    if verbosity == 0 {
        return configured.to_string();
    }
    let base = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(configured))
        .unwrap_or(2);
    let raised = (base + verbosity as usize).min(LEVELS.len() - 1);
    LEVELS[raised].to_string()
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: &LoggingConfig, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(effective_level(&config.level, verbosity)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Full => builder.try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_level() {
        assert_eq!(effective_level("info", 0), "info");
        assert_eq!(effective_level("info", 1), "debug");
        assert_eq!(effective_level("warn", 5), "trace");
        assert_eq!(effective_level("bt_ref_harness=debug", 0), "bt_ref_harness=debug");
        assert_eq!(effective_level("nonsense", 1), "debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init(&config, 0);
        init(&config, 2);
    }
}
