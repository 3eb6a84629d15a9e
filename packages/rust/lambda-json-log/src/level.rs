//! Severity parsing.
//!
//! Levels are expressed with the `tracing` types so the logger and the
//! [`JsonLogLayer`](crate::JsonLogLayer) bridge share one notion of severity.
//! The accepted names are the usual ones plus the aliases Lambda and zap-style
//! configuration tend to use (`none`, `warning`, `dpanic`, `panic`, `fatal`).

use crate::constants;
use std::io::{self, Write};
use tracing::level_filters::LevelFilter;

/// Parse a severity name, case-insensitively.
///
/// Returns `None` for anything that is not a recognized name, including the
/// empty string.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "dpanic" | "panic" | "fatal" => Some(LevelFilter::ERROR),
        "off" | "none" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Resolve the configured level, falling back to `info`.
///
/// A malformed value is reported on stderr and never fails the caller.
pub fn resolve_level(value: &str) -> LevelFilter {
    resolve_level_reporting(value, &mut io::stderr())
}

fn resolve_level_reporting<W: Write>(value: &str, diagnostics: &mut W) -> LevelFilter {
    parse_level(value).unwrap_or_else(|| {
        // Nowhere left to report a failed diagnostic.
        let _ = writeln!(diagnostics, "malformed log level: {:?}", value);
        parse_level(constants::defaults::LOG_LEVEL).unwrap_or(LevelFilter::INFO)
    })
}
