//! Typed readers for loosely-typed JSON values.
//!
//! Every reader distinguishes a value that is absent from one that is present
//! but unusable, so callers can apply their own per-field default and still
//! count the coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use std::str::FromStr;

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Suffixes exchanges append to perpetual contract symbols.
const CONTRACT_SUFFIXES: [&str; 6] = ["-SWAP", "-PERP", "_PERP", "_UMCBL", "_DMCBL", "_CMCBL"];

/// Settlement assets that may follow a `:` in a unified derivatives symbol.
const SETTLEMENT_ASSETS: [&str; 6] = ["USDT", "USDC", "USD", "BUSD", "BTC", "ETH"];

/// Outcome of reading one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<T> {
    Value(T),
    Absent,
    Invalid,
}

impl<T> Parsed<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Absent | Parsed::Invalid => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Parsed::Invalid)
    }
}

/// Reads a decimal from a JSON number or a numeric string (plain or scientific).
pub fn parse_decimal(value: Option<&Value>) -> Parsed<Decimal> {
    match value {
        None | Some(Value::Null) => Parsed::Absent,
        Some(Value::Number(n)) => {
            let parsed = if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            };
            parsed.map_or(Parsed::Invalid, Parsed::Value)
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Parsed::Absent;
            }
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map_or(Parsed::Invalid, Parsed::Value)
        }
        Some(_) => Parsed::Invalid,
    }
}

/// Reads a UTC timestamp from RFC 3339, `YYYY-MM-DD[ HH:MM:SS[.f]]`, or an
/// epoch number in seconds or milliseconds.
pub fn parse_timestamp(value: Option<&Value>) -> Parsed<DateTime<Utc>> {
    match value {
        None | Some(Value::Null) => Parsed::Absent,
        Some(Value::Number(n)) => {
            let millis = match n.as_i64() {
                Some(i) => epoch_to_millis(i),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| {
                        if f.abs() > EPOCH_MILLIS_THRESHOLD as f64 {
                            f
                        } else {
                            f * 1000.0
                        }
                    })
                    .filter(|ms| ms.abs() < i64::MAX as f64)
                    .map(|ms| ms as i64),
            };
            millis
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map_or(Parsed::Invalid, Parsed::Value)
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Parsed::Absent;
            }
            if let Ok(i) = s.parse::<i64>() {
                return epoch_to_millis(i)
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                    .map_or(Parsed::Invalid, Parsed::Value);
            }
            parse_date_string(s).map_or(Parsed::Invalid, Parsed::Value)
        }
        Some(_) => Parsed::Invalid,
    }
}

fn epoch_to_millis(value: i64) -> Option<i64> {
    if value.unsigned_abs() > EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        Some(value)
    } else {
        value.checked_mul(1000)
    }
}

fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads a trimmed, non-empty string. Numbers are accepted and rendered as text.
pub fn parse_text(value: Option<&Value>) -> Parsed<String> {
    match value {
        None | Some(Value::Null) => Parsed::Absent,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Parsed::Absent
            } else {
                Parsed::Value(s.to_string())
            }
        }
        Some(Value::Number(n)) => Parsed::Value(n.to_string()),
        Some(_) => Parsed::Invalid,
    }
}

/// Reduces an exchange-specific symbol to an uppercase ticker without
/// separators: `btc/usdt:usdt`, `BINANCE:BTCUSDT`, `BTC-USDT-SWAP` and
/// `BTCUSDT` all become `BTCUSDT`.
///
/// Text after a `:` is a settlement asset when the market has a `/` or the
/// text is a known quote asset; otherwise the text before it is a venue prefix.
pub fn normalize_symbol(raw: &str) -> String {
    let mut symbol = raw.trim().to_ascii_uppercase();
    if let Some((left, right)) = symbol.split_once(':') {
        let settlement = left.contains('/') || SETTLEMENT_ASSETS.contains(&right.trim());
        symbol = if settlement { left } else { right }.to_string();
    }
    for suffix in CONTRACT_SUFFIXES {
        if let Some(stripped) = symbol.strip_suffix(suffix) {
            symbol = stripped.to_string();
            break;
        }
    }
    symbol.retain(|c| !matches!(c, '/' | '-' | '_' | ' '));
    symbol
}
