use crate::enums::{Outcome, PnlSource, TradeSide};
use crate::error::CoreError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A closed trade in canonical form.
///
/// Produced once by the normalizer from a raw record snapshot and never
/// mutated afterwards. Any change to the underlying records means building a
/// new set of trades and re-running every computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    /// Uppercase, exchange-agnostic ticker (e.g. `BTCUSDT`).
    pub symbol: String,
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Position size in base units.
    pub quantity: Decimal,
    pub leverage: Decimal,
    pub fees: Decimal,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub pnl_usd: Decimal,
    pub pnl_percent: Decimal,
    pub pnl_source: PnlSource,
    pub setup: Option<String>,
    pub exchange: String,
}

impl Trade {
    /// Capital committed to the position: `entry_price * quantity / leverage`.
    /// Zero when leverage is zero or the figure does not fit in a `Decimal`.
    pub fn margin_used(&self) -> Decimal {
        self.entry_price
            .checked_mul(self.quantity)
            .and_then(|notional| notional.checked_div(self.leverage))
            .unwrap_or(Decimal::ZERO)
    }

    /// The timestamp used for chronological ordering.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.exit_time.or(self.entry_time)
    }

    /// Time between entry and exit, when both are known.
    pub fn holding_period(&self) -> Option<Duration> {
        match (self.entry_time, self.exit_time) {
            (Some(entry), Some(exit)) => Some(exit - entry),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::of(self.pnl_usd)
    }

    pub fn is_win(&self) -> bool {
        self.outcome() == Outcome::Win
    }

    /// Checks the canonical invariants every trade must hold.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbol.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "symbol".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if self.entry_price <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "entry_price".to_string(),
                format!("must be positive, got {}", self.entry_price),
            ));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "quantity".to_string(),
                format!("must be positive, got {}", self.quantity),
            ));
        }
        if self.entry_price.checked_mul(self.quantity).is_none() {
            return Err(CoreError::InvalidInput(
                "quantity".to_string(),
                "entry_price * quantity does not fit in a decimal".to_string(),
            ));
        }
        if self.leverage < Decimal::ONE {
            return Err(CoreError::InvalidInput(
                "leverage".to_string(),
                format!("must be at least 1, got {}", self.leverage),
            ));
        }
        if self.fees.is_sign_negative() && !self.fees.is_zero() {
            return Err(CoreError::InvalidInput(
                "fees".to_string(),
                format!("must not be negative, got {}", self.fees),
            ));
        }
        if let (Some(entry), Some(exit)) = (self.entry_time, self.exit_time) {
            if exit < entry {
                return Err(CoreError::InvalidInput(
                    "exit_time".to_string(),
                    "must not precede entry_time".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A single OHLCV bar supplied by the price-feed collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Candles for one symbol over a requested range, used for trade replay.
/// The engine carries these through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub candles: Vec<Candle>,
}
