use core_types::Trade;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Margin and PnL of a single trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRisk {
    pub trade_id: String,
    pub margin_used: Decimal,
    pub leverage: Decimal,
    pub pnl_usd: Decimal,
}

/// Aggregate risk profile of a trade set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub total_trades: usize,
    pub loss_count: usize,
    /// `loss_count / total_trades`, as a fraction.
    pub loss_rate: Decimal,
    /// Mean absolute PnL of the losing trades.
    pub avg_risk: Decimal,
    /// The most negative PnL, 0 when nothing lost.
    pub max_single_loss: Decimal,
    /// Mean margin over all trades.
    pub avg_position_size: Decimal,
    pub max_position_size: Decimal,
    pub avg_leverage: Decimal,
    pub per_trade: Vec<TradeRisk>,
}

impl RiskReport {
    pub fn new() -> Self {
        Self {
            total_trades: 0,
            loss_count: 0,
            loss_rate: Decimal::ZERO,
            avg_risk: Decimal::ZERO,
            max_single_loss: Decimal::ZERO,
            avg_position_size: Decimal::ZERO,
            max_position_size: Decimal::ZERO,
            avg_leverage: Decimal::ZERO,
            per_trade: Vec::new(),
        }
    }
}

impl Default for RiskReport {
    fn default() -> Self {
        Self::new()
    }
}

/// A stateless calculator for margin and loss statistics.
#[derive(Debug, Default)]
pub struct RiskAnalyzer {}

impl RiskAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, trades: &[Trade]) -> RiskReport {
        let mut report = RiskReport::new();
        if trades.is_empty() {
            return report;
        }

        let mut total_margin = Decimal::ZERO;
        let mut total_leverage = Decimal::ZERO;
        let mut total_loss = Decimal::ZERO;

        for trade in trades {
            let margin = trade.margin_used();
            total_margin = total_margin.saturating_add(margin);
            total_leverage = total_leverage.saturating_add(trade.leverage);
            report.max_position_size = report.max_position_size.max(margin);

            if !trade.is_win() {
                report.loss_count += 1;
                total_loss = total_loss.saturating_add(trade.pnl_usd.abs());
                report.max_single_loss = report.max_single_loss.min(trade.pnl_usd);
            }

            report.per_trade.push(TradeRisk {
                trade_id: trade.id.clone(),
                margin_used: margin,
                leverage: trade.leverage,
                pnl_usd: trade.pnl_usd,
            });
        }

        let total = Decimal::from(trades.len());
        report.total_trades = trades.len();
        report.loss_rate = Decimal::from(report.loss_count) / total;
        report.avg_position_size = total_margin / total;
        report.avg_leverage = total_leverage / total;
        if report.loss_count > 0 {
            report.avg_risk = total_loss / Decimal::from(report.loss_count);
        }

        tracing::debug!(
            total_trades = report.total_trades,
            loss_count = report.loss_count,
            max_single_loss = %report.max_single_loss,
            "Risk profile computed."
        );
        report
    }
}
