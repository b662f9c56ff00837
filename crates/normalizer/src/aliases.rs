use crate::error::NormalizeError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The fields of a canonical trade that can be read from a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Id,
    Symbol,
    Side,
    EntryPrice,
    ExitPrice,
    Quantity,
    Leverage,
    Fees,
    EntryTime,
    ExitTime,
    PnlUsd,
    PnlPercent,
    Setup,
    Exchange,
}

/// Number of canonical fields.
pub const FIELD_COUNT: usize = 14;

impl CanonicalField {
    pub const ALL: [CanonicalField; FIELD_COUNT] = [
        CanonicalField::Id,
        CanonicalField::Symbol,
        CanonicalField::Side,
        CanonicalField::EntryPrice,
        CanonicalField::ExitPrice,
        CanonicalField::Quantity,
        CanonicalField::Leverage,
        CanonicalField::Fees,
        CanonicalField::EntryTime,
        CanonicalField::ExitTime,
        CanonicalField::PnlUsd,
        CanonicalField::PnlPercent,
        CanonicalField::Setup,
        CanonicalField::Exchange,
    ];

    /// The name used for this field in configuration and rejection reasons.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Id => "id",
            CanonicalField::Symbol => "symbol",
            CanonicalField::Side => "side",
            CanonicalField::EntryPrice => "entry_price",
            CanonicalField::ExitPrice => "exit_price",
            CanonicalField::Quantity => "quantity",
            CanonicalField::Leverage => "leverage",
            CanonicalField::Fees => "fees",
            CanonicalField::EntryTime => "entry_time",
            CanonicalField::ExitTime => "exit_time",
            CanonicalField::PnlUsd => "pnl_usd",
            CanonicalField::PnlPercent => "pnl_percent",
            CanonicalField::Setup => "setup",
            CanonicalField::Exchange => "exchange",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Source keys accepted for this field out of the box, in priority order.
    pub fn builtin_aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Id => &["id", "trade_id", "tradeId", "order_id", "orderId"],
            CanonicalField::Symbol => &["symbol", "pair", "coin", "ticker", "market"],
            CanonicalField::Side => &["side", "direction", "position_type", "positionType"],
            CanonicalField::EntryPrice => &[
                "entry",
                "entry_price",
                "entryPrice",
                "open",
                "open_price",
                "avg_entry_price",
            ],
            CanonicalField::ExitPrice => &[
                "exit",
                "exit_price",
                "exitPrice",
                "close",
                "close_price",
                "avg_exit_price",
            ],
            CanonicalField::Quantity => &["size", "quantity", "position_size", "qty", "amount"],
            CanonicalField::Leverage => &["leverage", "lev"],
            CanonicalField::Fees => &["fees", "fee", "commission"],
            CanonicalField::EntryTime => &[
                "date",
                "entry_time",
                "entryTime",
                "open_time",
                "opened_at",
            ],
            CanonicalField::ExitTime => &["exit_time", "exitTime", "close_time", "closed_at"],
            CanonicalField::PnlUsd => &["pnl", "pnl_usd", "pnlUsd", "realized_pnl", "closed_pnl"],
            CanonicalField::PnlPercent => &["pnl_percent", "pnlPercent", "pnl_pct", "roe"],
            CanonicalField::Setup => &["setup", "strategy", "tag"],
            CanonicalField::Exchange => &["exchange", "source", "platform"],
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Ordered source keys for every canonical field.
#[derive(Debug, Clone)]
pub struct AliasTable {
    keys: [Vec<String>; FIELD_COUNT],
}

impl AliasTable {
    pub fn builtin() -> Self {
        Self {
            keys: CanonicalField::ALL.map(|field| {
                field
                    .builtin_aliases()
                    .iter()
                    .map(|k| k.to_string())
                    .collect()
            }),
        }
    }

    /// The built-in table with `overrides` (canonical field name -> keys)
    /// tried first.
    pub fn with_overrides(
        source_name: &str,
        overrides: &HashMap<String, Vec<String>>,
    ) -> Result<Self, NormalizeError> {
        let mut table = Self::builtin();
        for (name, extra) in overrides {
            let field =
                CanonicalField::from_name(name).ok_or_else(|| NormalizeError::UnknownAliasField {
                    source_name: source_name.to_string(),
                    field: name.clone(),
                })?;
            let keys = &mut table.keys[field.slot()];
            let builtin = std::mem::take(keys);
            keys.extend(extra.iter().cloned());
            keys.extend(builtin.into_iter().filter(|k| !extra.contains(k)));
        }
        Ok(table)
    }

    pub fn keys(&self, field: CanonicalField) -> &[String] {
        &self.keys[field.slot()]
    }

    /// The first present value for `field`. Nulls and blank strings count as absent.
    pub fn resolve<'a>(&self, record: &'a Map<String, Value>, field: CanonicalField) -> Option<&'a Value> {
        self.keys(field)
            .iter()
            .filter_map(|key| record.get(key))
            .find(|value| !is_blank(value))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// The built-in table plus one compiled table per configured source.
#[derive(Debug, Clone)]
pub struct SourceAdapters {
    builtin: AliasTable,
    per_source: HashMap<String, AliasTable>,
}

impl SourceAdapters {
    /// Compiles the per-source overrides once, keyed by lowercase exchange name.
    pub fn compile(
        sources: &HashMap<String, HashMap<String, Vec<String>>>,
    ) -> Result<Self, NormalizeError> {
        let per_source = sources
            .iter()
            .map(|(name, overrides)| {
                AliasTable::with_overrides(name, overrides)
                    .map(|table| (name.to_ascii_lowercase(), table))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            builtin: AliasTable::builtin(),
            per_source,
        })
    }

    /// Picks the table for a record from the exchange it names.
    pub fn for_record(&self, record: &Map<String, Value>) -> &AliasTable {
        self.builtin
            .resolve(record, CanonicalField::Exchange)
            .and_then(Value::as_str)
            .and_then(|exchange| self.per_source.get(&exchange.trim().to_ascii_lowercase()))
            .unwrap_or(&self.builtin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn first_present_non_null_alias_wins() {
        let table = AliasTable::builtin();
        let r = record(json!({ "entry": null, "entry_price": "", "open": 42, "entryPrice": 7 }));
        assert_eq!(table.resolve(&r, CanonicalField::EntryPrice), Some(&json!(7)));

        let r = record(json!({ "open": 42 }));
        assert_eq!(table.resolve(&r, CanonicalField::EntryPrice), Some(&json!(42)));
        assert_eq!(table.resolve(&r, CanonicalField::ExitPrice), None);
    }

    #[test]
    fn names_round_trip_for_every_field() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_name(field.name()), Some(field));
            assert!(!field.builtin_aliases().is_empty());
        }
    }

    #[test]
    fn overrides_are_tried_before_builtins() {
        let overrides = HashMap::from([(
            "entry_price".to_string(),
            vec!["openAvgPx".to_string(), "entry".to_string()],
        )]);
        let table = AliasTable::with_overrides("okx", &overrides).unwrap();
        let keys = table.keys(CanonicalField::EntryPrice);
        assert_eq!(keys[0], "openAvgPx");
        assert_eq!(keys[1], "entry");
        assert_eq!(keys.iter().filter(|k| *k == "entry").count(), 1);
    }

    #[test]
    fn unknown_override_field_is_an_error() {
        let overrides = HashMap::from([("price".to_string(), vec!["px".to_string()])]);
        assert!(matches!(
            AliasTable::with_overrides("okx", &overrides),
            Err(NormalizeError::UnknownAliasField { .. })
        ));
    }

    #[test]
    fn records_pick_their_source_table() {
        let sources = HashMap::from([(
            "OKX".to_string(),
            HashMap::from([("entry_price".to_string(), vec!["openAvgPx".to_string()])]),
        )]);
        let adapters = SourceAdapters::compile(&sources).unwrap();

        let okx = record(json!({ "exchange": "okx", "openAvgPx": 1, "entry": 2 }));
        let table = adapters.for_record(&okx);
        assert_eq!(table.resolve(&okx, CanonicalField::EntryPrice), Some(&json!(1)));

        let other = record(json!({ "exchange": "bybit", "openAvgPx": 1, "entry": 2 }));
        let table = adapters.for_record(&other);
        assert_eq!(table.resolve(&other, CanonicalField::EntryPrice), Some(&json!(2)));
    }
}
