//! Logging infrastructure for live-reloader.
//!
//! Structured logging built on the `tracing` ecosystem. Request lines, SSE
//! connection counts, watch events and reload broadcasts are all emitted as
//! `tracing` events and rendered by the compact formatter configured here.
//!
//! # Verbosity Levels
//!
//! 1. `--verbose`: DEBUG for this crate
//! 2. `--quiet`: ERROR only
//! 3. `RUST_LOG` environment variable: custom filter
//! 4. Default: INFO for this crate
//!
//! # Example
//!
//! ```rust,no_run
//! use live_reloader::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Serving files");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "live_reloader=info";
const VERBOSE_FILTER: &str = "live_reloader=debug";
const QUIET_FILTER: &str = "live_reloader=error";

/// Build the filter selected by the global flags.
pub fn env_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber with the specified options.
///
/// Must be called once, before any logging occurs. `verbose` wins over
/// `quiet` (clap already rejects passing both).
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(env_filter(verbose, quiet), no_color);
}

/// Initialize logger with custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .compact();

    // A second initialisation (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_verbose_filter_wins_over_quiet() {
        let filter = env_filter(true, true);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_quiet_filter() {
        let filter = env_filter(false, true);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(false, true, true);
    }
}
