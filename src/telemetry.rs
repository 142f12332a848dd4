//! Log subscriber setup. Logs go to stderr so they never mix with the
//! rendered weather on stdout.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Filter directive for the configured level. `verbose` raises it to debug.
#[must_use]
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("meteo={level},tower_http={level},warn")
}

/// Install the global subscriber. `RUST_LOG` wins over the configuration.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbose)));

    let result = if config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::default();
        assert_eq!(
            filter_directive(&config, false),
            "meteo=info,tower_http=info,warn"
        );
        assert!(filter_directive(&config, true).starts_with("meteo=debug"));
    }
}
