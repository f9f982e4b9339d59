//! Tracing subscriber for the CLI. Logs go to stderr so stdout stays
//! machine-readable.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a filter directive, e.g. `resolve=debug`.
pub const LOG_ENV: &str = "GROVE_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// `--log-level` wins over `GROVE_LOG`; without either only warnings show.
pub fn filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

pub fn init(level: Option<&str>, format: LogFormat, color: bool) {
    let use_ansi = color && std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
    let builder = fmt::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(use_ansi);
    // A subscriber may already be installed (tests); keep it.
    let _ = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => tracing::subscriber::set_global_default(builder.compact().finish()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_overrides_environment() {
        assert_eq!(filter(Some("resolve=debug")).to_string(), "resolve=debug");
    }
}
