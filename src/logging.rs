//! Structured logging initialization.
//!
//! Supports human-friendly and machine-readable (JSON) output formats,
//! with TTY detection and verbosity control.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::cli::LogFormat;

/// Filter directive for a verbosity level.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "skycam=error,tower_http=error";
    }
    match verbose {
        0 => "skycam=info,tower_http=info",
        1 => "skycam=debug,tower_http=debug",
        _ => "skycam=trace,tower_http=trace",
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Arguments
///
/// * `format` - Log line format
/// * `verbose` - Verbosity level: 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - If true, only errors are logged
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override default filter (e.g., "skycam=debug,tower_http=warn")
///
/// # Output Behavior
///
/// | Format | TTY | Output |
/// |--------|-----|--------|
/// | Json | any | JSON lines to stderr |
/// | Auto | yes | Pretty colored output to stderr |
/// | Auto | no | Compact plain output to stderr |
/// | Compact | any | Compact plain output to stderr |
pub fn init_logging(format: LogFormat, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let pretty = format == LogFormat::Auto && io::stderr().is_terminal();

    if format.is_json() {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else if pretty {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        // Piped or redirected
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be set once per process, so only the
    // directives are checked here.

    #[test]
    fn test_filter_directives() {
        for (verbose, quiet) in [(0, false), (1, false), (2, false), (5, false), (0, true)] {
            assert!(EnvFilter::try_new(default_directive(verbose, quiet)).is_ok());
        }
        assert_eq!(default_directive(0, false), "skycam=info,tower_http=info");
        assert!(default_directive(3, true).starts_with("skycam=error"));
    }
}
