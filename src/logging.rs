//! Tracing setup for the `conductor` binary.
//!
//! Logs go to stderr so they do not interleave with the progress display on
//! stdout. `RUST_LOG` overrides the default filter.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "conductor=debug,warn"
    } else {
        "conductor=info,warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. `json` switches to one JSON object per line.
pub fn init(verbose: bool, json: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(verbose));

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbose)
                    .without_time()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_respects_verbose() {
        assert_eq!(default_directive(false), "conductor=info,warn");
        assert_eq!(default_directive(true), "conductor=debug,warn");
        assert!(default_directive(true).parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init(false, false);
        assert!(init(true, true).is_err());
    }
}
