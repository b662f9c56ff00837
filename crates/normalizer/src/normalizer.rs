use crate::aliases::{AliasTable, CanonicalField, SourceAdapters};
use crate::error::{NormalizeError, RejectionReason};
use crate::parse::{Parsed, normalize_symbol, parse_decimal, parse_text, parse_timestamp};
use analytics::{PnlInputs, resolve_pnl};
use chrono::{DateTime, Utc};
use configuration::NormalizerSettings;
use core_types::{Trade, TradeSide};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

const DEFAULT_EXCHANGE: &str = "manual";

/// A raw record that did not become a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position of the record in the input collection.
    pub position: usize,
    pub id: Option<String>,
    pub reason: RejectionReason,
}

/// The outcome of one normalization pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub trades: Vec<Trade>,
    pub rejections: Vec<Rejection>,
    /// Fields that were present but unusable and fell back to a default.
    pub coerced_fields: usize,
}

/// Counts that describe a batch, without the trades themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub coerced_fields: usize,
    pub rejections: Vec<Rejection>,
}

impl NormalizedBatch {
    pub fn accepted(&self) -> usize {
        self.trades.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    /// Orders trades by close time; undated trades keep their relative order at the end.
    pub fn sort_chronologically(&mut self) {
        self.trades
            .sort_by_key(|t| (t.closed_at().is_none(), t.closed_at()));
    }

    pub fn into_parts(self) -> (Vec<Trade>, NormalizationSummary) {
        let summary = NormalizationSummary {
            accepted: self.trades.len(),
            rejected: self.rejections.len(),
            coerced_fields: self.coerced_fields,
            rejections: self.rejections,
        };
        (self.trades, summary)
    }
}

/// Turns raw exchange or manual-entry records into canonical trades.
///
/// Alias tables are compiled once at construction; every record of every
/// batch is read through them.
#[derive(Debug, Clone)]
pub struct Normalizer {
    settings: NormalizerSettings,
    adapters: SourceAdapters,
}

impl Normalizer {
    pub fn new(settings: &NormalizerSettings) -> Result<Self, NormalizeError> {
        Ok(Self {
            adapters: SourceAdapters::compile(&settings.sources)?,
            settings: settings.clone(),
        })
    }

    /// Normalizes a JSON array of records or a JSON object mapping ids to records.
    pub fn normalize_collection(&self, collection: &Value) -> Result<NormalizedBatch, NormalizeError> {
        let entries: Vec<(String, &Value)> = match collection {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (format!("row-{i}"), item))
                .collect(),
            Value::Object(map) => map.iter().map(|(key, item)| (key.clone(), item)).collect(),
            other => return Err(NormalizeError::InvalidCollection(json_kind(other))),
        };

        let mut batch = NormalizedBatch::default();
        for (position, (fallback_id, entry)) in entries.into_iter().enumerate() {
            let Value::Object(record) = entry else {
                tracing::debug!(position, "Skipping collection entry that is not a record.");
                batch.rejections.push(Rejection {
                    position,
                    id: None,
                    reason: RejectionReason::NotARecord,
                });
                continue;
            };

            match self.normalize_record(record, &fallback_id) {
                Ok((trade, coerced)) => {
                    batch.coerced_fields += coerced;
                    batch.trades.push(trade);
                }
                Err(reason) => {
                    let id = self.read_id(record);
                    tracing::debug!(position, id = ?id, %reason, "Rejected raw record.");
                    batch.rejections.push(Rejection {
                        position,
                        id,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            accepted = batch.accepted(),
            rejected = batch.rejected(),
            coerced = batch.coerced_fields,
            "Normalization pass complete."
        );
        if batch.rejected() > 0 {
            tracing::warn!(
                rejected = batch.rejected(),
                total = batch.accepted() + batch.rejected(),
                "Some raw records were rejected."
            );
        }
        Ok(batch)
    }

    /// Normalizes one record, returning the trade and the number of fields
    /// that had to fall back to a default.
    pub fn normalize_record(
        &self,
        record: &Map<String, Value>,
        fallback_id: &str,
    ) -> Result<(Trade, usize), RejectionReason> {
        let mut reader = RecordReader::new(record, self.adapters.for_record(record));

        let symbol = reader
            .text(CanonicalField::Symbol)
            .map(|raw| normalize_symbol(&raw))
            .filter(|s| !s.is_empty())
            .ok_or(RejectionReason::MissingRequiredField("symbol"))?;

        let entry_price = reader
            .decimal(CanonicalField::EntryPrice)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or(RejectionReason::MissingRequiredField("entry_price"))?;

        let quantity = reader
            .decimal(CanonicalField::Quantity)
            .filter(|q| *q > Decimal::ZERO)
            .ok_or(RejectionReason::MissingRequiredField("quantity"))?;

        let exit_price = reader
            .decimal_where(CanonicalField::ExitPrice, |p| p > Decimal::ZERO)
            .unwrap_or(entry_price);

        let exchange = reader
            .text(CanonicalField::Exchange)
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());

        let leverage = reader
            .decimal_where(CanonicalField::Leverage, |l| l >= Decimal::ONE)
            .unwrap_or_else(|| self.settings.leverage_for(&exchange, &symbol));

        let fees = reader
            .decimal(CanonicalField::Fees)
            .map(|f| f.abs())
            .unwrap_or(Decimal::ZERO);

        let side = reader
            .text(CanonicalField::Side)
            .map_or(TradeSide::Long, |label| TradeSide::from_label(&label));

        let (entry_time, exit_time) = order_times(
            reader.timestamp(CanonicalField::EntryTime),
            reader.timestamp(CanonicalField::ExitTime),
        );

        let inputs = PnlInputs {
            side,
            entry_price,
            exit_price,
            quantity,
            leverage,
            fees,
        };
        let reported_usd = reader.decimal(CanonicalField::PnlUsd);
        let reported_percent = reader.decimal(CanonicalField::PnlPercent);
        inputs.notional()?;
        let pnl = resolve_pnl(&inputs, reported_usd, reported_percent)?;

        let trade = Trade {
            id: reader
                .text(CanonicalField::Id)
                .unwrap_or_else(|| fallback_id.to_string()),
            symbol,
            side,
            entry_price,
            exit_price,
            quantity,
            leverage,
            fees,
            entry_time,
            exit_time,
            pnl_usd: pnl.usd,
            pnl_percent: pnl.percent,
            pnl_source: pnl.source,
            setup: reader.text(CanonicalField::Setup),
            exchange,
        };
        Ok((trade, reader.coerced))
    }

    fn read_id(&self, record: &Map<String, Value>) -> Option<String> {
        let table = self.adapters.for_record(record);
        parse_text(table.resolve(record, CanonicalField::Id)).ok()
    }
}

/// Reads canonical fields from one record and counts values that were present
/// but unparsable or out of range.
struct RecordReader<'a> {
    record: &'a Map<String, Value>,
    table: &'a AliasTable,
    coerced: usize,
}

impl<'a> RecordReader<'a> {
    fn new(record: &'a Map<String, Value>, table: &'a AliasTable) -> Self {
        Self {
            record,
            table,
            coerced: 0,
        }
    }

    fn raw(&self, field: CanonicalField) -> Option<&'a Value> {
        self.table.resolve(self.record, field)
    }

    fn decimal(&mut self, field: CanonicalField) -> Option<Decimal> {
        let raw = self.raw(field);
        let parsed = parse_decimal(raw);
        self.note(field, raw, &parsed);
        parsed.ok()
    }

    /// Like `decimal`, but a parsed value failing `accept` also counts as
    /// coerced and reads as absent.
    fn decimal_where(
        &mut self,
        field: CanonicalField,
        accept: impl Fn(Decimal) -> bool,
    ) -> Option<Decimal> {
        let value = self.decimal(field)?;
        if accept(value) {
            return Some(value);
        }
        self.coerced += 1;
        tracing::debug!(field = field.name(), %value, "Out-of-range value, falling back to default.");
        None
    }

    fn timestamp(&mut self, field: CanonicalField) -> Option<DateTime<Utc>> {
        let raw = self.raw(field);
        let parsed = parse_timestamp(raw);
        self.note(field, raw, &parsed);
        parsed.ok()
    }

    fn text(&mut self, field: CanonicalField) -> Option<String> {
        let raw = self.raw(field);
        let parsed = parse_text(raw);
        self.note(field, raw, &parsed);
        parsed.ok()
    }

    fn note<T>(&mut self, field: CanonicalField, raw: Option<&Value>, parsed: &Parsed<T>) {
        if parsed.is_invalid() {
            self.coerced += 1;
            tracing::debug!(field = field.name(), value = ?raw, "Unusable value, falling back to default.");
        }
    }
}

/// A reversed pair is swapped; a lone timestamp stands for both ends.
fn order_times(
    entry: Option<DateTime<Utc>>,
    exit: Option<DateTime<Utc>>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match (entry, exit) {
        (Some(entry), Some(exit)) if exit < entry => (Some(exit), Some(entry)),
        (Some(entry), None) => (Some(entry), Some(entry)),
        (None, Some(exit)) => (Some(exit), Some(exit)),
        pair => pair,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use configuration::LeverageDefault;
    use core_types::PnlSource;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;

    fn normalizer() -> Normalizer {
        Normalizer::new(&NormalizerSettings::default()).unwrap()
    }

    fn one(record: Value) -> Result<(Trade, usize), RejectionReason> {
        let Value::Object(map) = record else {
            panic!("fixture must be an object");
        };
        normalizer().normalize_record(&map, "row-0")
    }

    #[test]
    fn computes_pnl_when_the_source_does_not_report_it() {
        let (trade, coerced) = one(json!({
            "symbol": "BTC/USDT",
            "side": "long",
            "entry": 100,
            "exit": 110,
            "size": 1,
        }))
        .unwrap();

        assert_eq!(coerced, 0);
        assert_eq!(trade.id, "row-0");
        assert_eq!(trade.symbol, "BTCUSDT");
        assert_eq!(trade.side, TradeSide::Long);
        assert_eq!(trade.leverage, Decimal::ONE);
        assert_eq!(trade.fees, Decimal::ZERO);
        assert_eq!(trade.exchange, "manual");
        assert_eq!(trade.pnl_usd, dec!(10));
        assert_eq!(trade.pnl_percent, dec!(10));
        assert_eq!(trade.pnl_source, PnlSource::Computed);
        assert!(trade.validate().is_ok());
    }

    #[test]
    fn aliases_and_reported_pnl() {
        let (trade, _) = one(json!({
            "trade_id": "abc",
            "pair": "eth-usdt-swap",
            "direction": "SELL",
            "open_price": "2000",
            "close_price": "1900",
            "qty": "0.5",
            "lev": 5,
            "commission": -1.5,
            "closed_pnl": "48.5",
            "strategy": "breakout",
            "platform": "OKX",
        }))
        .unwrap();

        assert_eq!(trade.id, "abc");
        assert_eq!(trade.symbol, "ETHUSDT");
        assert_eq!(trade.side, TradeSide::Short);
        assert_eq!(trade.leverage, dec!(5));
        assert_eq!(trade.fees, dec!(1.5));
        assert_eq!(trade.pnl_usd, dec!(48.5));
        assert_eq!(trade.pnl_source, PnlSource::Reported);
        assert_eq!(trade.setup.as_deref(), Some("breakout"));
        assert_eq!(trade.exchange, "okx");
    }

    #[test]
    fn missing_exit_price_means_a_flat_trade() {
        let (trade, _) = one(json!({ "symbol": "SOLUSDT", "entry": 20, "size": 3 })).unwrap();
        assert_eq!(trade.exit_price, dec!(20));
        assert_eq!(trade.pnl_usd, Decimal::ZERO);
    }

    #[test]
    fn required_fields_are_enforced() {
        assert_eq!(
            one(json!({ "entry": 1, "size": 1 })).unwrap_err(),
            RejectionReason::MissingRequiredField("symbol")
        );
        assert_eq!(
            one(json!({ "symbol": "X", "entry": 0, "size": 1 })).unwrap_err(),
            RejectionReason::MissingRequiredField("entry_price")
        );
        assert_eq!(
            one(json!({ "symbol": "X", "entry": "n/a", "size": 1 })).unwrap_err(),
            RejectionReason::MissingRequiredField("entry_price")
        );
        assert_eq!(
            one(json!({ "symbol": "X", "entry": 1, "size": -2 })).unwrap_err(),
            RejectionReason::MissingRequiredField("quantity")
        );
        assert_eq!(
            one(json!({ "symbol": "X", "entry": 1 })).unwrap_err(),
            RejectionReason::MissingRequiredField("quantity")
        );
    }

    #[test]
    fn unusable_optional_values_fall_back_and_are_counted() {
        let (trade, coerced) = one(json!({
            "symbol": "BTCUSDT",
            "entry": 100,
            "exit": "oops",
            "size": 1,
            "leverage": "high",
            "fees": [],
            "date": "last tuesday",
        }))
        .unwrap();

        assert_eq!(coerced, 4);
        assert_eq!(trade.exit_price, dec!(100));
        assert_eq!(trade.leverage, Decimal::ONE);
        assert_eq!(trade.fees, Decimal::ZERO);
        assert_eq!(trade.entry_time, None);
    }

    #[test]
    fn leverage_below_one_uses_the_configured_default() {
        let settings = NormalizerSettings {
            leverage_defaults: vec![LeverageDefault {
                exchange: "bybit".to_string(),
                symbol: Some("BTCUSDT".to_string()),
                leverage: dec!(10),
            }],
            ..NormalizerSettings::default()
        };
        let normalizer = Normalizer::new(&settings).unwrap();
        let record = json!({ "symbol": "BTCUSDT", "entry": 100, "size": 1, "leverage": 0, "exchange": "Bybit" });
        let (trade, coerced) = normalizer
            .normalize_record(record.as_object().unwrap(), "row-0")
            .unwrap();
        assert_eq!(trade.leverage, dec!(10));
        assert_eq!(coerced, 1);
    }

    #[test]
    fn out_of_range_values_are_counted_as_coerced() {
        let (trade, coerced) = one(json!({
            "symbol": "BTCUSDT", "entry": 100, "size": 1, "exit": 0, "leverage": "0.5",
        }))
        .unwrap();
        assert_eq!(trade.exit_price, dec!(100));
        assert_eq!(trade.leverage, Decimal::ONE);
        assert_eq!(coerced, 2);

        let (_, coerced) = one(json!({ "symbol": "BTCUSDT", "entry": 100, "size": 1, "exit": -5 })).unwrap();
        assert_eq!(coerced, 1);
    }

    #[test]
    fn extreme_epoch_dates_are_coerced_not_fatal() {
        let (trade, coerced) = one(json!({
            "symbol": "BTCUSDT", "entry": 100, "size": 1, "date": i64::MIN,
        }))
        .unwrap();
        assert_eq!(coerced, 1);
        assert_eq!(trade.exit_time, None);
    }

    #[test]
    fn oversized_figures_reject_the_record_not_the_batch() {
        let batch = normalizer()
            .normalize_collection(&json!([
                { "id": "ok", "symbol": "BTCUSDT", "entry": 100, "exit": 110, "size": 1 },
                { "id": "huge", "symbol": "BTCUSDT", "entry": "2", "exit": "3",
                  "size": "79228162514264337593543950335" },
                { "id": "huge-reported", "symbol": "BTCUSDT", "entry": "2", "size": "79228162514264337593543950335",
                  "pnl": 5, "pnl_percent": 1 },
            ]))
            .unwrap();

        assert_eq!(batch.accepted(), 1);
        assert_eq!(batch.trades[0].id, "ok");
        assert_eq!(
            batch.rejections[0],
            Rejection {
                position: 1,
                id: Some("huge".to_string()),
                reason: RejectionReason::NumericOverflow("notional"),
            }
        );
        assert_eq!(
            batch.rejections[1].reason,
            RejectionReason::NumericOverflow("notional")
        );

        assert_eq!(
            one(json!({ "symbol": "BTCUSDT", "entry": "0.0000000000000000000000000001",
                        "exit": 10, "size": 1 }))
            .unwrap_err(),
            RejectionReason::NumericOverflow("pct_move")
        );
    }

    #[test]
    fn timestamps_are_ordered_and_completed() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let (trade, _) = one(json!({
            "symbol": "BTCUSDT", "entry": 1, "size": 1,
            "entry_time": "2024-03-01T12:00:00Z",
            "exit_time": "2024-03-01 08:00:00",
        }))
        .unwrap();
        assert_eq!((trade.entry_time, trade.exit_time), (Some(early), Some(late)));

        let (trade, _) = one(json!({
            "symbol": "BTCUSDT", "entry": 1, "size": 1,
            "closed_at": 1_709_294_400_000i64,
        }))
        .unwrap();
        assert_eq!((trade.entry_time, trade.exit_time), (Some(late), Some(late)));
    }

    #[test]
    fn collection_keeps_valid_records_in_order() {
        let batch = normalizer()
            .normalize_collection(&json!([
                { "symbol": "BTCUSDT", "entry": 100, "size": 1 },
                { "entry": 100, "size": 1 },
                "not a record",
                { "id": "keep", "symbol": "ETHUSDT", "entry": 10, "size": 2, "exit": "x" },
            ]))
            .unwrap();

        assert_eq!(batch.accepted(), 2);
        assert_eq!(batch.rejected(), 2);
        assert_eq!(batch.coerced_fields, 1);
        assert_eq!(batch.trades[0].id, "row-0");
        assert_eq!(batch.trades[1].id, "keep");
        assert_eq!(
            batch.rejections[0],
            Rejection {
                position: 1,
                id: None,
                reason: RejectionReason::MissingRequiredField("symbol"),
            }
        );
        assert_eq!(batch.rejections[1].reason, RejectionReason::NotARecord);
        assert!(batch.trades.iter().all(|t| t.validate().is_ok()));
    }

    #[test]
    fn object_collections_use_keys_as_fallback_ids() {
        let batch = normalizer()
            .normalize_collection(&json!({
                "t1": { "symbol": "BTCUSDT", "entry": 100, "size": 1 },
                "t2": { "id": "explicit", "symbol": "BTCUSDT", "entry": 100, "size": 1 },
            }))
            .unwrap();
        let ids: Vec<&str> = batch.trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t1", "explicit"]);
    }

    #[test]
    fn scalars_are_not_collections() {
        for value in [json!(null), json!(3), json!("trades"), json!(true)] {
            assert!(matches!(
                normalizer().normalize_collection(&value),
                Err(NormalizeError::InvalidCollection(_))
            ));
        }
        let empty = normalizer().normalize_collection(&json!([])).unwrap();
        assert_eq!(empty.accepted(), 0);
        assert_eq!(empty.rejected(), 0);
    }

    #[test]
    fn per_source_aliases_apply_to_matching_records() {
        let settings = NormalizerSettings {
            sources: HashMap::from([(
                "blofin".to_string(),
                HashMap::from([("entry_price".to_string(), vec!["openAveragePrice".to_string()])]),
            )]),
            ..NormalizerSettings::default()
        };
        let batch = Normalizer::new(&settings)
            .unwrap()
            .normalize_collection(&json!([
                { "exchange": "blofin", "symbol": "BTCUSDT", "openAveragePrice": 50, "size": 1 },
                { "exchange": "bybit", "symbol": "BTCUSDT", "openAveragePrice": 50, "size": 1 },
            ]))
            .unwrap();
        assert_eq!(batch.accepted(), 1);
        assert_eq!(batch.trades[0].entry_price, dec!(50));
    }

    #[test]
    fn chronological_sort_puts_undated_trades_last() {
        let mut batch = normalizer()
            .normalize_collection(&json!([
                { "id": "undated", "symbol": "A", "entry": 1, "size": 1 },
                { "id": "late", "symbol": "A", "entry": 1, "size": 1, "date": "2024-02-02" },
                { "id": "early", "symbol": "A", "entry": 1, "size": 1, "date": "2024-02-01" },
            ]))
            .unwrap();
        batch.sort_chronologically();
        let ids: Vec<&str> = batch.trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["early", "late", "undated"]);

        let (trades, summary) = batch.into_parts();
        assert_eq!(trades.len(), 3);
        assert_eq!(summary.accepted, 3);
        assert!(summary.rejections.is_empty());
    }
}
