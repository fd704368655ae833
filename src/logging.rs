use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

/// Filter directive for a configured level. A bare level is scoped to this
/// crate; anything containing `=` is used as-is.
pub fn filter_directive(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        format!("gradebookd={}", level)
    }
}

/// Installs the global subscriber. Logs go to stderr; stdout carries IPC.
///
/// `RUST_LOG` wins over the configured level (`GRADEBOOKD_LOG`).
pub fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_are_scoped_to_the_crate() {
        assert_eq!(filter_directive("debug"), "gradebookd=debug");
        assert_eq!(filter_directive("gradebookd=trace,warn"), "gradebookd=trace,warn");
    }
}
