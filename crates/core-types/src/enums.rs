use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Maps a raw side label onto a side. `SELL` and `SHORT` (any case) are
    /// short, everything else is long.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("sell") || label.eq_ignore_ascii_case("short") {
            TradeSide::Short
        } else {
            TradeSide::Long
        }
    }

    /// Returns `1` for longs and `-1` for shorts.
    pub fn direction(&self) -> Decimal {
        match self {
            TradeSide::Long => Decimal::ONE,
            TradeSide::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "LONG"),
            TradeSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Win/loss classification. Break-even trades count as wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn of(pnl_usd: Decimal) -> Self {
        if pnl_usd.is_sign_negative() && !pnl_usd.is_zero() {
            Outcome::Loss
        } else {
            Outcome::Win
        }
    }
}

/// Where a trade's PnL figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PnlSource {
    /// The exchange or the user supplied the realized PnL.
    Reported,
    /// Derived from prices, size, leverage and fees.
    Computed,
}
