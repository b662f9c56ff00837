use crate::report::{DrawdownPoint, EquityPoint, PerformanceReport};
use core_types::Trade;
use rust_decimal::Decimal;

/// Seconds in an hour, for converting holding periods.
pub(crate) const SECONDS_PER_HOUR: i64 = 3_600;

/// Returns a copy of `trades` ordered by close time (exit, falling back to
/// entry). The sort is stable; trades with no timestamp at all keep their
/// input order and go last.
pub fn chronological(trades: &[Trade]) -> Vec<Trade> {
    let mut sorted = trades.to_vec();
    sorted.sort_by_key(|t| (t.closed_at().is_none(), t.closed_at()));
    sorted
}

/// Builds the cumulative PnL curve of chronologically ordered trades.
///
/// The curve starts at an origin point of zero equity, followed by one point
/// per trade. An empty trade list yields an empty curve.
pub fn equity_curve(trades: &[Trade]) -> Vec<EquityPoint> {
    if trades.is_empty() {
        return Vec::new();
    }

    let mut curve = Vec::with_capacity(trades.len() + 1);
    curve.push(EquityPoint {
        index: 0,
        trade_id: None,
        time: None,
        pnl_usd: Decimal::ZERO,
        equity: Decimal::ZERO,
    });

    let mut equity = Decimal::ZERO;
    for (i, trade) in trades.iter().enumerate() {
        equity = equity.saturating_add(trade.pnl_usd);
        curve.push(EquityPoint {
            index: i + 1,
            trade_id: Some(trade.id.clone()),
            time: trade.closed_at(),
            pnl_usd: trade.pnl_usd,
            equity,
        });
    }
    curve
}

/// Derives the drawdown series from an equity curve, point for point.
pub fn drawdown_series(curve: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let Some(first) = curve.first() else {
        return Vec::new();
    };

    let mut peak = first.equity;
    let mut duration = 0;
    curve
        .iter()
        .map(|point| {
            if point.equity >= peak {
                peak = point.equity;
                duration = 0;
            } else {
                duration += 1;
            }
            DrawdownPoint {
                index: point.index,
                peak,
                drawdown: point.equity.saturating_sub(peak),
                duration,
            }
        })
        .collect()
}

/// A stateless calculator for deriving performance metrics from trading activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - Closed trades in chronological order (see [`chronological`]).
    ///
    /// # Returns
    ///
    /// The `PerformanceReport`. An empty slice yields the zeroed report.
    pub fn calculate(&self, trades: &[Trade]) -> PerformanceReport {
        let mut report = PerformanceReport::new();

        if trades.is_empty() {
            return report;
        }

        self.calculate_profitability(trades, &mut report);
        self.calculate_drawdown(trades, &mut report);
        self.calculate_time_metrics(trades, &mut report);

        report
    }

    /// Calculates all profitability-related metrics.
    fn calculate_profitability(&self, trades: &[Trade], report: &mut PerformanceReport) {
        report.total_trades = trades.len();

        for trade in trades {
            let pnl = trade.pnl_usd;
            report.total_net_profit = report.total_net_profit.saturating_add(pnl);
            report.total_fees = report.total_fees.saturating_add(trade.fees);

            if trade.is_win() {
                report.gross_profit = report.gross_profit.saturating_add(pnl);
                report.winning_trades += 1;
                report.largest_win = report.largest_win.max(pnl);
            } else {
                report.gross_loss = report.gross_loss.saturating_add(pnl.abs());
                report.losing_trades += 1;
                report.largest_loss = report.largest_loss.min(pnl);
            }
        }

        // --- Ratios ---
        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = report.gross_profit.checked_div(report.gross_loss);
        }

        report.win_rate_pct = Some(
            Decimal::from(report.winning_trades) / Decimal::from(report.total_trades)
                * Decimal::ONE_HUNDRED,
        );

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }

        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
            if report.average_loss > Decimal::ZERO {
                report.payoff_ratio = report.average_win.checked_div(report.average_loss);
            }
        }
    }

    /// Builds the equity and drawdown series and their extremes.
    fn calculate_drawdown(&self, trades: &[Trade], report: &mut PerformanceReport) {
        report.equity_curve = equity_curve(trades);
        report.drawdown = drawdown_series(&report.equity_curve);

        for point in &report.drawdown {
            report.max_drawdown = report.max_drawdown.min(point.drawdown);
            report.longest_drawdown = report.longest_drawdown.max(point.duration);
        }
    }

    /// Calculates time-based metrics.
    fn calculate_time_metrics(&self, trades: &[Trade], report: &mut PerformanceReport) {
        let held: Vec<i64> = trades
            .iter()
            .filter_map(|t| t.holding_period())
            .map(|d| d.num_seconds())
            .collect();

        if held.is_empty() {
            return;
        }

        let total_secs: i128 = held.iter().map(|s| i128::from(*s)).sum();
        report.average_holding_hours = Some(
            Decimal::from_i128_with_scale(total_secs, 0)
                / Decimal::from(held.len())
                / Decimal::from(SECONDS_PER_HOUR),
        );
    }
}
