use chrono::{DateTime, TimeZone, Utc};
use core_types::{PnlSource, Trade, TradeSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// `2024-01-<day> <hour>:00:00 UTC`. January 1st 2024 is a Monday.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

/// An undated 1x BTCUSDT long with the given PnL and a margin of 100.
pub fn trade(id: &str, pnl_usd: Decimal) -> Trade {
    Trade {
        id: id.to_string(),
        symbol: "BTCUSDT".to_string(),
        side: TradeSide::Long,
        entry_price: dec!(100),
        exit_price: dec!(100),
        quantity: dec!(1),
        leverage: dec!(1),
        fees: Decimal::ZERO,
        entry_time: None,
        exit_time: None,
        pnl_usd,
        pnl_percent: pnl_usd,
        pnl_source: PnlSource::Reported,
        setup: None,
        exchange: "manual".to_string(),
    }
}
