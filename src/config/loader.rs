//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, TradeError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Broker variables `TT_USERNAME`, `TT_PASSWORD`, `TT_ACCOUNT`
/// 2. Environment variables (prefixed with APP__)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    // Broker credentials keep their conventional names
    for (var, key) in [
        ("TT_USERNAME", "broker.username"),
        ("TT_PASSWORD", "broker.password"),
        ("TT_ACCOUNT", "broker.account_number"),
    ] {
        if let Ok(value) = std::env::var(var) {
            builder = builder
                .set_override(key, value)
                .map_err(|e| TradeError::Configuration(e.to_string()))?;
        }
    }

    let config = builder
        .build()
        .map_err(|e| TradeError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| TradeError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some("does-not-exist.toml")).unwrap();
        assert_eq!(config.streaming.retry_delay_ms, 1000);
        assert_eq!(config.settings.log_level, "info");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let path = std::env::temp_dir().join("signal_options_loader_test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"[streaming]
max_attempts = 5

[portfolio]
benchmark_symbol = "QQQ"

[orders]
default_order_type = "LIMIT"
expiration_filter = "weeklies""#
        )
        .unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.streaming.max_attempts, 5);
        assert_eq!(config.portfolio.benchmark_symbol, "QQQ");
        assert_eq!(
            config.orders.default_order_type,
            crate::common::types::OrderType::Limit
        );
        assert_eq!(
            config.orders.expiration_filter,
            crate::chain::types::ExpirationFilter::Weeklies
        );

        std::fs::remove_file(path).ok();
    }
}
