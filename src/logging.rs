//! Logging configuration for pg-dataframe.
//!
//! Logs go to stderr so stdout carries only the rendered table.

use tracing_subscriber::EnvFilter;

/// Returns the filter to use: `RUST_LOG` if set, otherwise `debug` when
/// verbose and `info` when not.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose))
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

/// Initializes logging to stderr.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_stderr_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init();
}
