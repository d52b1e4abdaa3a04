//! Tracing initialisation

use tracing_subscriber::EnvFilter;

use okg_core::LoggingConfig;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns `false` when a
/// subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
