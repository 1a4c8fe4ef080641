//! Tracing setup shared by every CLI command.
//!
//! Cycles log inside a `cycle` span carrying a `cycle_id`, so with the JSON
//! format every line of one cycle can be correlated in journald.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `EnvFilter` directives for the base level plus each module override.
///
/// ```
/// use costgate::config::LoggingConfig;
/// use costgate::logging::build_filter_directives;
///
/// let mut config = LoggingConfig::default();
/// config.modules.insert("budget".to_string(), "debug".to_string());
///
/// assert_eq!(build_filter_directives(&config), "info,costgate::budget=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.level.clone()];
    directives.extend(
        config
            .modules
            .iter()
            .map(|(module, level)| format!("costgate::{}={}", module, level)),
    );
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so `status --json` output on stdout stays parseable.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}
