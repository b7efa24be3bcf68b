//! Tracing subscriber setup for binaries embedding the dispatchers.
//!
//! The library only emits events; installing a subscriber is the binary's job.

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides `config.filter` when it is set.
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|err| anyhow::anyhow!(err))
    .context("failed to install tracing subscriber")
}

fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.filter),
    }
    .with_context(|| format!("invalid log filter {:?}", config.filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let config = LoggingConfig {
            filter: "rebar=notalevel".to_string(),
            json: false,
        };
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn second_install_reports_existing_subscriber() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);

        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("failed to install tracing subscriber"));
    }

    #[test]
    fn accepts_default_filter() {
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }
}
