//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise `mqscaler=info`, raised to `debug`
//! when verbose output is requested.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

/// Default filter directive for the given verbosity
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "mqscaler=debug"
    } else {
        "mqscaler=info"
    }
}

/// Install the global tracing subscriber
pub fn init_logging(format: LogFormat, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_follows_verbosity() {
        assert_eq!(default_directive(false), "mqscaler=info");
        assert_eq!(default_directive(true), "mqscaler=debug");
        assert!(EnvFilter::try_new(default_directive(true)).is_ok());
    }
}
