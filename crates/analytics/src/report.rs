use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One point of the cumulative PnL curve.
///
/// Index 0 is the origin (no trade, equity 0); index `i + 1` is the equity
/// after the `i`-th trade in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub index: usize,
    pub trade_id: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub pnl_usd: Decimal,
    pub equity: Decimal,
}

/// Drawdown at the equity point with the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub index: usize,
    pub peak: Decimal,
    /// `equity - peak`, never positive.
    pub drawdown: Decimal,
    /// Consecutive points (this one included) spent below the peak.
    pub duration: usize,
}

/// A comprehensive, standardized report of a trader's performance.
///
/// This struct is the output of the `AnalyticsEngine`. Trade-level counts
/// treat break-even trades as wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Core Profitability Metrics
    pub total_net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub total_fees: Decimal,
    pub profit_factor: Option<Decimal>, // None when there is no gross loss

    // II. Drawdown
    pub max_drawdown: Decimal,
    pub longest_drawdown: usize,

    // III. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Option<Decimal>, // None for cases with 0 trades
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub payoff_ratio: Option<Decimal>, // None because avg_loss can be 0
    pub largest_win: Decimal,
    pub largest_loss: Decimal,

    // IV. Time-Based Metrics
    /// Mean of the trades that have both timestamps.
    pub average_holding_hours: Option<Decimal>,

    // V. Series
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown: Vec<DrawdownPoint>,
}

impl PerformanceReport {
    /// Creates a new, zeroed-out PerformanceReport.
    pub fn new() -> Self {
        Self {
            total_net_profit: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            profit_factor: None,
            max_drawdown: Decimal::ZERO,
            longest_drawdown: 0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: None,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            payoff_ratio: None,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            average_holding_hours: None,
            equity_curve: Vec::new(),
            drawdown: Vec::new(),
        }
    }
}

impl Default for PerformanceReport {
    fn default() -> Self {
        Self::new()
    }
}
