use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The root configuration structure for the analytics engine.
///
/// Every section carries defaults, so an empty file (or no file at all) is a
/// valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub normalizer: NormalizerSettings,
    pub buckets: BucketSettings,
    pub confluence: ConfluenceSettings,
}

impl EngineConfig {
    /// Checks that every value is usable by the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalizer.validate()?;
        self.buckets.validate()?;
        self.confluence.validate()?;
        Ok(())
    }
}

/// Parameters for turning raw records into canonical trades.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Leverage assumed when neither the record nor an override supplies one.
    pub default_leverage: Decimal,
    /// Per exchange (and optionally per symbol) leverage defaults.
    pub leverage_defaults: Vec<LeverageDefault>,
    /// Extra aliases per source, keyed by exchange, then by canonical field name.
    /// These are tried before the built-in aliases.
    pub sources: HashMap<String, HashMap<String, Vec<String>>>,
}

/// A leverage default for one exchange, optionally narrowed to a symbol.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeverageDefault {
    pub exchange: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub leverage: Decimal,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            default_leverage: Decimal::ONE,
            leverage_defaults: Vec::new(),
            sources: HashMap::new(),
        }
    }
}

impl NormalizerSettings {
    /// Resolves the default leverage for a trade: an exact `(exchange, symbol)`
    /// entry wins over an exchange-wide entry, which wins over the global default.
    ///
    /// `exchange` is compared case-insensitively; `symbol` is expected in its
    /// canonical uppercase form.
    pub fn leverage_for(&self, exchange: &str, symbol: &str) -> Decimal {
        let mut exchange_wide = None;
        for entry in &self.leverage_defaults {
            if !entry.exchange.eq_ignore_ascii_case(exchange) {
                continue;
            }
            match &entry.symbol {
                Some(s) if s.eq_ignore_ascii_case(symbol) => return entry.leverage,
                Some(_) => {}
                None => {
                    if exchange_wide.is_none() {
                        exchange_wide = Some(entry.leverage);
                    }
                }
            }
        }
        exchange_wide.unwrap_or(self.default_leverage)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_leverage < Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "normalizer.default_leverage must be at least 1, got {}",
                self.default_leverage
            )));
        }
        for entry in &self.leverage_defaults {
            if entry.leverage < Decimal::ONE {
                return Err(ConfigError::ValidationError(format!(
                    "leverage default for exchange '{}' must be at least 1, got {}",
                    entry.exchange, entry.leverage
                )));
            }
            if entry.exchange.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "leverage default entries need an exchange".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Parameters for the bucketing dimensions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BucketSettings {
    /// Offset applied to UTC timestamps before taking hour-of-day and day-of-week.
    pub utc_offset_minutes: i32,
    /// Holding time assumed for trades with no timestamps at all.
    pub holding_placeholder_hours: Decimal,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            holding_placeholder_hours: dec!(2),
        }
    }
}

impl BucketSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::ValidationError(format!(
                "buckets.utc_offset_minutes must be within +/-840, got {}",
                self.utc_offset_minutes
            )));
        }
        if self.holding_placeholder_hours <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "buckets.holding_placeholder_hours must be positive, got {}",
                self.holding_placeholder_hours
            )));
        }
        Ok(())
    }
}

/// Which bucket statistics a trade is judged against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ConfluenceMode {
    /// Stats are recomputed without the trade being scored.
    #[default]
    LeaveOneOut,
    /// Stats include the trade being scored.
    FullHistory,
}

/// Parameters for the confluence score.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfluenceSettings {
    pub mode: ConfluenceMode,
    /// How many of the best buckets count as "optimal".
    pub top_k: usize,
    /// Symbols with fewer trades than this never rank.
    pub min_symbol_trades: usize,
    pub weights: ConfluenceWeights,
}

impl Default for ConfluenceSettings {
    fn default() -> Self {
        Self {
            mode: ConfluenceMode::default(),
            top_k: 3,
            min_symbol_trades: 3,
            weights: ConfluenceWeights::default(),
        }
    }
}

impl ConfluenceSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "confluence.top_k must be at least 1".to_string(),
            ));
        }
        let w = &self.weights;
        for (name, weight) in [
            ("hour", w.hour),
            ("day_of_week", w.day_of_week),
            ("symbol", w.symbol),
            ("size", w.size),
        ] {
            if weight.is_sign_negative() && !weight.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "confluence.weights.{name} must not be negative, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Relative weight of each confluence factor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfluenceWeights {
    pub hour: Decimal,
    pub day_of_week: Decimal,
    pub symbol: Decimal,
    pub size: Decimal,
}

impl Default for ConfluenceWeights {
    fn default() -> Self {
        Self {
            hour: Decimal::ONE,
            day_of_week: Decimal::ONE,
            symbol: Decimal::ONE,
            size: Decimal::ONE,
        }
    }
}

impl ConfluenceWeights {
    pub fn total(&self) -> Decimal {
        self.hour + self.day_of_week + self.symbol + self.size
    }
}
