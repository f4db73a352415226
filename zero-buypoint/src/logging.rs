//! Logging setup for the buy-point engine.
//!
//! The engine itself only emits `tracing` events; hosts that do not install
//! their own subscriber can call [`init_logging`] once at startup.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

/// Target of every event this crate emits.
const CRATE_TARGET: &str = "zero_buypoint";

/// Filter directives for a configured level.
///
/// A bare level (`debug`) applies to this crate only and leaves everything
/// else at `warn`. Anything containing a directive (`=`, `,`) is used as is.
fn default_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return format!("warn,{}=info", CRATE_TARGET);
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("warn,{}={}", CRATE_TARGET, level)
}

/// Build the EnvFilter, preferring `RUST_LOG` when it is set.
fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::try_new(default_directives(log_level))
        .unwrap_or_else(|_| EnvFilter::new(default_directives("info")))
}

/// Initialize logging.
///
/// # Arguments
///
/// * `log_level` - Level for this crate (e.g. `info`) or full filter directives
/// * `log_format` - Output format: "json" for structured JSON, anything else for human-readable
///
/// JSON output carries thread names so batch events from rayon workers can
/// be told apart. Calling this more than once is harmless: later calls leave
/// the first subscriber in place.
pub fn init_logging(log_level: &str, log_format: &str) {
    let filter = build_filter(log_level);

    let subscriber = tracing_subscriber::registry().with(filter);

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_thread_names(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::info!(
        log_level = %log_level,
        log_format = %log_format,
        "Logging initialized"
    );
}

/// Initialize logging from the observability section of the engine config.
pub fn init_from_config(config: &ObservabilityConfig) {
    init_logging(&config.log_level, &config.log_format);
}
