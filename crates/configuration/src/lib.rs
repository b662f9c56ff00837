use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    BucketSettings, ConfluenceMode, ConfluenceSettings, ConfluenceWeights, EngineConfig, LeverageDefault,
    NormalizerSettings,
};

/// The file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix for environment overrides, e.g. `JOURNAL__CONFLUENCE__TOP_K=2`.
pub const ENV_PREFIX: &str = "JOURNAL";

/// Loads the engine configuration.
///
/// Reads `path` (required when given) or `config.toml` in the working
/// directory (optional), layers `JOURNAL__*` environment variables on top,
/// deserializes into `EngineConfig` and validates it.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<EngineConfig>()?;
    config.validate()?;

    tracing::debug!(?config, "Configuration loaded.");
    Ok(config)
}

/// Parses a TOML document into a validated `EngineConfig`, ignoring the environment.
pub fn load_config_from_str(toml: &str) -> Result<EngineConfig, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<EngineConfig>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_document_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.normalizer.default_leverage, dec!(1));
        assert_eq!(config.confluence.top_k, 3);
        assert_eq!(config.buckets.holding_placeholder_hours, dec!(2));
    }

    #[test]
    fn reads_every_section() {
        let config = load_config_from_str(
            r#"
            [normalizer]
            default_leverage = 2

            [[normalizer.leverage_defaults]]
            exchange = "bybit"
            symbol = "BTCUSDT"
            leverage = 10

            [normalizer.sources.blofin]
            entry_price = ["openAveragePrice"]

            [buckets]
            utc_offset_minutes = 120

            [confluence]
            mode = "full-history"
            top_k = 2
            min_symbol_trades = 5

            [confluence.weights]
            hour = 2
            size = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.normalizer.default_leverage, dec!(2));
        assert_eq!(config.normalizer.leverage_for("bybit", "BTCUSDT"), dec!(10));
        assert_eq!(
            config.normalizer.sources["blofin"]["entry_price"],
            vec!["openAveragePrice".to_string()]
        );
        assert_eq!(config.buckets.utc_offset_minutes, 120);
        assert_eq!(config.confluence.mode, ConfluenceMode::FullHistory);
        assert_eq!(config.confluence.top_k, 2);
        assert_eq!(config.confluence.weights.hour, dec!(2));
        assert_eq!(config.confluence.weights.size, dec!(0.5));
        assert_eq!(config.confluence.weights.symbol, dec!(1));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = load_config_from_str("[confluence]\ntop_k = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
