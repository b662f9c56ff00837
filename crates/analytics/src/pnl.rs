use crate::error::AnalyticsError;
use core_types::{PnlSource, TradeSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The raw figures a PnL calculation needs. Unlike `Trade`, nothing here is
/// guaranteed valid, so every division is guarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlInputs {
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub leverage: Decimal,
    pub fees: Decimal,
}

/// Profit and loss of a single trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pnl {
    pub usd: Decimal,
    /// Return on margin, in percent.
    pub percent: Decimal,
    pub source: PnlSource,
}

impl PnlInputs {
    /// `entry_price * quantity`.
    pub fn notional(&self) -> Result<Decimal, AnalyticsError> {
        self.entry_price
            .checked_mul(self.quantity)
            .ok_or(AnalyticsError::Overflow("notional"))
    }

    /// `entry_price * quantity / leverage`, or zero when leverage is not positive.
    pub fn margin_used(&self) -> Result<Decimal, AnalyticsError> {
        if self.leverage <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        self.notional()?
            .checked_div(self.leverage)
            .ok_or(AnalyticsError::Overflow("margin_used"))
    }

    /// Signed fractional price move in the trade's favour. Zero for a
    /// non-positive entry price.
    pub fn pct_move(&self) -> Result<Decimal, AnalyticsError> {
        if self.entry_price <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        self.exit_price
            .checked_sub(self.entry_price)
            .and_then(|diff| diff.checked_div(self.entry_price))
            .map(|pct| pct * self.side.direction())
            .ok_or(AnalyticsError::Overflow("pct_move"))
    }
}

/// Computes PnL from prices alone.
///
/// `usd` is the move applied to the notional (`quantity * entry_price`) net of
/// fees; `percent` is that result relative to the margin, which equals
/// `pct_move * 100 * leverage` for a fee-free trade. Figures too large for a
/// `Decimal` are an error, never a panic.
pub fn compute_pnl(inputs: &PnlInputs) -> Result<Pnl, AnalyticsError> {
    if inputs.entry_price <= Decimal::ZERO {
        return Ok(Pnl {
            usd: Decimal::ZERO,
            percent: Decimal::ZERO,
            source: PnlSource::Computed,
        });
    }

    let usd = inputs
        .notional()?
        .checked_mul(inputs.pct_move()?)
        .and_then(|gross| gross.checked_sub(inputs.fees))
        .ok_or(AnalyticsError::Overflow("pnl_usd"))?;
    Ok(Pnl {
        usd,
        percent: percent_of_margin(usd, inputs.margin_used()?)?,
        source: PnlSource::Computed,
    })
}

/// Uses source-reported figures when present, computing whatever is missing.
///
/// A reported USD PnL is authoritative. A reported percentage is only taken
/// together with it; otherwise the percentage is derived from the margin.
pub fn resolve_pnl(
    inputs: &PnlInputs,
    reported_usd: Option<Decimal>,
    reported_percent: Option<Decimal>,
) -> Result<Pnl, AnalyticsError> {
    match reported_usd {
        Some(usd) => Ok(Pnl {
            usd,
            percent: match reported_percent {
                Some(percent) => percent,
                None => percent_of_margin(usd, inputs.margin_used()?)?,
            },
            source: PnlSource::Reported,
        }),
        None => compute_pnl(inputs),
    }
}

fn percent_of_margin(pnl_usd: Decimal, margin: Decimal) -> Result<Decimal, AnalyticsError> {
    if margin <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    pnl_usd
        .checked_div(margin)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(AnalyticsError::Overflow("pnl_percent"))
}
