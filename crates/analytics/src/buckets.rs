//! Group-by-dimension reducers.
//!
//! A [`Dimension`] maps every trade onto exactly one label of a closed label
//! set; [`reduce`] folds a trade list into per-label statistics. Because the
//! key function returns an index into the label set, every dimension
//! partitions the trades exactly once.

use crate::engine::SECONDS_PER_HOUR;
use chrono::{Datelike, FixedOffset, Offset, Timelike, Utc};
use configuration::BucketSettings;
use core_types::Trade;
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Label for trades whose timestamp is unknown.
pub const UNKNOWN_BUCKET: &str = "unknown";

const HOLDING_LABELS: [&str; 5] = ["<1h", "1-4h", "4-8h", "8-24h", "24h+"];
const HOLDING_EDGES_HOURS: [i64; 4] = [1, 4, 8, 24];

const LEVERAGE_LABELS: [&str; 4] = ["1-6x", "6-11x", "11-26x", "26x+"];
const LEVERAGE_EDGES: [i64; 3] = [6, 11, 26];

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const QUINTILE_LABELS: [&str; 5] = ["Q1", "Q2", "Q3", "Q4", "Q5"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    HoldingTime,
    HourOfDay,
    DayOfWeek,
    Leverage,
    SizeQuintile,
    Symbol,
    ConfluenceScore,
}

/// An analytical axis along which trades are grouped.
pub trait Dimension: Send + Sync {
    fn kind(&self) -> DimensionKind;

    /// The closed label set, in display order.
    fn labels(&self) -> Vec<String>;

    /// Index into `labels()` of the bucket the trade belongs to.
    fn bucket_of(&self, trade: &Trade) -> usize;
}

/// Aggregate statistics of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub label: String,
    pub count: usize,
    /// Trades with `pnl_usd >= 0`.
    pub win_count: usize,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    /// `win_count / count` as a fraction, 0 for an empty bucket.
    pub win_rate: Decimal,
}

impl BucketStats {
    fn empty(label: String) -> Self {
        Self {
            label,
            count: 0,
            win_count: 0,
            total_pnl: Decimal::ZERO,
            avg_pnl: Decimal::ZERO,
            win_rate: Decimal::ZERO,
        }
    }

    fn add(&mut self, trade: &Trade) {
        self.count += 1;
        if trade.is_win() {
            self.win_count += 1;
        }
        self.total_pnl = self.total_pnl.saturating_add(trade.pnl_usd);
    }

    fn finish(&mut self) {
        if self.count > 0 {
            let count = Decimal::from(self.count);
            self.avg_pnl = self.total_pnl / count;
            self.win_rate = Decimal::from(self.win_count) / count;
        }
    }
}

/// The result of reducing a trade list along one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionReport {
    pub kind: DimensionKind,
    pub total_count: usize,
    pub buckets: Vec<BucketStats>,
    /// Bucket index of each input trade, aligned with the reduced slice.
    #[serde(skip)]
    pub assignments: Vec<usize>,
}

impl DimensionReport {
    /// Stats of the bucket the `trade_index`-th trade was assigned to.
    pub fn bucket_of_trade(&self, trade_index: usize) -> Option<(usize, &BucketStats)> {
        let index = *self.assignments.get(trade_index)?;
        self.buckets.get(index).map(|b| (index, b))
    }

    pub fn find(&self, label: &str) -> Option<&BucketStats> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

/// Reduces `trades` with an arbitrary key function over a closed label set.
///
/// `key` receives the trade's position and the trade itself and returns an
/// index into `labels`.
pub fn reduce_with<F>(
    kind: DimensionKind,
    trades: &[Trade],
    labels: Vec<String>,
    key: F,
) -> DimensionReport
where
    F: Fn(usize, &Trade) -> usize,
{
    let mut buckets: Vec<BucketStats> = labels.into_iter().map(BucketStats::empty).collect();
    let mut assignments = Vec::with_capacity(trades.len());

    for (i, trade) in trades.iter().enumerate() {
        let index = key(i, trade);
        match buckets.get_mut(index) {
            Some(bucket) => bucket.add(trade),
            None => tracing::warn!(
                ?kind,
                index,
                trade_id = %trade.id,
                "Bucket key outside of the label set."
            ),
        }
        assignments.push(index);
    }

    buckets.iter_mut().for_each(BucketStats::finish);

    DimensionReport {
        kind,
        total_count: trades.len(),
        buckets,
        assignments,
    }
}

/// Reduces `trades` along a [`Dimension`].
pub fn reduce<D: Dimension + ?Sized>(trades: &[Trade], dimension: &D) -> DimensionReport {
    reduce_with(dimension.kind(), trades, dimension.labels(), |_, trade| {
        dimension.bucket_of(trade)
    })
}

fn index_below(value: Decimal, edges: &[i64]) -> usize {
    edges
        .iter()
        .position(|edge| value < Decimal::from(*edge))
        .unwrap_or(edges.len())
}

fn static_labels(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

/// Hours between entry and exit: `[0,1) [1,4) [4,8) [8,24) [24,inf)`.
#[derive(Debug, Clone)]
pub struct HoldingTime {
    placeholder_hours: Decimal,
}

impl HoldingTime {
    pub fn new(placeholder_hours: Decimal) -> Self {
        Self { placeholder_hours }
    }

    /// Whether the trade has no timestamp at all and falls back to the placeholder.
    pub fn is_estimated(trade: &Trade) -> bool {
        trade.entry_time.is_none() && trade.exit_time.is_none()
    }

    /// Holding hours; a single known timestamp means zero, none means the placeholder.
    pub fn hours(&self, trade: &Trade) -> Decimal {
        if Self::is_estimated(trade) {
            return self.placeholder_hours;
        }
        let seconds = trade.holding_period().map_or(0, |d| d.num_seconds().max(0));
        Decimal::from(seconds) / Decimal::from(SECONDS_PER_HOUR)
    }
}

impl Dimension for HoldingTime {
    fn kind(&self) -> DimensionKind {
        DimensionKind::HoldingTime
    }

    fn labels(&self) -> Vec<String> {
        static_labels(&HOLDING_LABELS)
    }

    fn bucket_of(&self, trade: &Trade) -> usize {
        index_below(self.hours(trade), &HOLDING_EDGES_HOURS)
    }
}

/// Hour of the entry, 00-23, plus `unknown`.
#[derive(Debug, Clone)]
pub struct HourOfDay {
    offset: FixedOffset,
}

impl HourOfDay {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Dimension for HourOfDay {
    fn kind(&self) -> DimensionKind {
        DimensionKind::HourOfDay
    }

    fn labels(&self) -> Vec<String> {
        (0..24)
            .map(|h| format!("{h:02}"))
            .chain(std::iter::once(UNKNOWN_BUCKET.to_string()))
            .collect()
    }

    fn bucket_of(&self, trade: &Trade) -> usize {
        match trade.entry_time.or(trade.exit_time) {
            Some(t) => t.with_timezone(&self.offset).hour() as usize,
            None => 24,
        }
    }
}

/// Weekday of the entry, Sunday first, plus `unknown`.
#[derive(Debug, Clone)]
pub struct DayOfWeek {
    offset: FixedOffset,
}

impl DayOfWeek {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Dimension for DayOfWeek {
    fn kind(&self) -> DimensionKind {
        DimensionKind::DayOfWeek
    }

    fn labels(&self) -> Vec<String> {
        WEEKDAY_LABELS
            .iter()
            .map(|l| l.to_string())
            .chain(std::iter::once(UNKNOWN_BUCKET.to_string()))
            .collect()
    }

    fn bucket_of(&self, trade: &Trade) -> usize {
        match trade.entry_time.or(trade.exit_time) {
            Some(t) => t.with_timezone(&self.offset).weekday().num_days_from_sunday() as usize,
            None => WEEKDAY_LABELS.len(),
        }
    }
}

/// Leverage ranges `[1,6) [6,11) [11,26) [26,inf)`.
#[derive(Debug, Clone, Default)]
pub struct Leverage;

impl Dimension for Leverage {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Leverage
    }

    fn labels(&self) -> Vec<String> {
        static_labels(&LEVERAGE_LABELS)
    }

    fn bucket_of(&self, trade: &Trade) -> usize {
        index_below(trade.leverage, &LEVERAGE_EDGES)
    }
}

/// Quintiles of the trader's own margin distribution.
///
/// Cut points sit at the 20th/40th/60th/80th percentiles (linear
/// interpolation); a trade goes to the first quintile whose cut point is at
/// least its margin.
#[derive(Debug, Clone)]
pub struct SizeQuintiles {
    cut_points: Vec<Decimal>,
}

impl SizeQuintiles {
    /// Computes the cut points with a full pass over `trades`.
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut margins: Vec<Decimal> = trades.iter().map(Trade::margin_used).collect();
        if margins.is_empty() {
            return Self {
                cut_points: Vec::new(),
            };
        }
        margins.sort();

        let cut_points = (1..QUINTILE_LABELS.len() as i64)
            .map(|i| percentile(&margins, Decimal::new(i * 20, 2)))
            .collect();
        Self { cut_points }
    }

    pub fn cut_points(&self) -> &[Decimal] {
        &self.cut_points
    }
}

impl Dimension for SizeQuintiles {
    fn kind(&self) -> DimensionKind {
        DimensionKind::SizeQuintile
    }

    fn labels(&self) -> Vec<String> {
        static_labels(&QUINTILE_LABELS)
    }

    fn bucket_of(&self, trade: &Trade) -> usize {
        let margin = trade.margin_used();
        self.cut_points
            .iter()
            .position(|cut| margin <= *cut)
            .unwrap_or(self.cut_points.len())
    }
}

/// Linear-interpolated percentile of a sorted, non-empty slice; `q` in `[0, 1]`.
fn percentile(sorted: &[Decimal], q: Decimal) -> Decimal {
    let last = sorted.len().saturating_sub(1);
    let rank = Decimal::from(last) * q;
    let floor = rank.floor();
    let lo = floor.to_usize().unwrap_or(0).min(last);
    let hi = (lo + 1).min(last);
    let spread = sorted[hi].saturating_sub(sorted[lo]);
    sorted[lo].saturating_add((rank - floor).saturating_mul(spread))
}

/// One bucket per distinct symbol, in alphabetical order.
///
/// Built from the same trades it later classifies.
#[derive(Debug, Clone)]
pub struct Symbol {
    symbols: Vec<String>,
    index: HashMap<String, usize>,
}

impl Symbol {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let symbols: Vec<String> = trades
            .iter()
            .map(|t| t.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self { symbols, index }
    }
}

impl Dimension for Symbol {
    fn kind(&self) -> DimensionKind {
        DimensionKind::Symbol
    }

    fn labels(&self) -> Vec<String> {
        self.symbols.clone()
    }

    fn bucket_of(&self, trade: &Trade) -> usize {
        self.index
            .get(&trade.symbol)
            .copied()
            .unwrap_or(self.symbols.len())
    }
}

/// Every dimension's buckets for one trade set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketingReport {
    pub dimensions: Vec<DimensionReport>,
    /// Trades whose holding time is the configured placeholder rather than measured.
    pub holding_time_estimated: usize,
    /// Margin cut points between the size quintiles.
    pub size_cut_points: Vec<Decimal>,
}

impl BucketingReport {
    pub fn dimension(&self, kind: DimensionKind) -> Option<&DimensionReport> {
        self.dimensions.iter().find(|d| d.kind == kind)
    }
}

/// Reduces `trades` along every built-in dimension, in parallel.
///
/// Dimension reports keep the order of `trades` in their assignments, so the
/// same slice must be used when looking trades up later.
pub fn bucket_trades(trades: &[Trade], settings: &BucketSettings) -> BucketingReport {
    let offset =
        FixedOffset::east_opt(settings.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let size = SizeQuintiles::from_trades(trades);
    let size_cut_points = size.cut_points().to_vec();

    let dimensions: Vec<Box<dyn Dimension>> = vec![
        Box::new(HoldingTime::new(settings.holding_placeholder_hours)),
        Box::new(HourOfDay::new(offset)),
        Box::new(DayOfWeek::new(offset)),
        Box::new(Leverage),
        Box::new(size),
        Box::new(Symbol::from_trades(trades)),
    ];

    let dimensions: Vec<DimensionReport> = dimensions
        .par_iter()
        .map(|d| reduce(trades, d.as_ref()))
        .collect();

    let holding_time_estimated = trades.iter().filter(|t| HoldingTime::is_estimated(t)).count();
    if holding_time_estimated > 0 {
        tracing::debug!(
            holding_time_estimated,
            placeholder_hours = %settings.holding_placeholder_hours,
            "Holding time estimated for trades without timestamps."
        );
    }

    BucketingReport {
        dimensions,
        holding_time_estimated,
        size_cut_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, trade};
    use rust_decimal_macros::dec;

    fn counts(report: &DimensionReport) -> Vec<usize> {
        report.buckets.iter().map(|b| b.count).collect()
    }

    #[test]
    fn reducer_computes_per_bucket_stats() {
        let trades = [
            trade("1", dec!(10)),
            trade("2", dec!(-4)),
            trade("3", dec!(0)),
            trade("4", dec!(6)),
        ];
        let report = reduce_with(
            DimensionKind::Symbol,
            &trades,
            vec!["even".into(), "odd".into(), "never".into()],
            |i, _| i % 2,
        );

        let even = &report.buckets[0];
        assert_eq!(even.count, 2);
        assert_eq!(even.win_count, 2);
        assert_eq!(even.total_pnl, dec!(10));
        assert_eq!(even.avg_pnl, dec!(5));
        assert_eq!(even.win_rate, dec!(1));

        let odd = &report.buckets[1];
        assert_eq!(odd.win_count, 1);
        assert_eq!(odd.avg_pnl, dec!(1));
        assert_eq!(odd.win_rate, dec!(0.5));

        let never = &report.buckets[2];
        assert_eq!(never.count, 0);
        assert_eq!(never.avg_pnl, Decimal::ZERO);
        assert_eq!(never.win_rate, Decimal::ZERO);

        assert_eq!(report.assignments, [0, 1, 0, 1]);
        assert_eq!(report.bucket_of_trade(3).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn holding_time_buckets_and_placeholder() {
        let mut quick = trade("quick", dec!(1));
        quick.entry_time = Some(at(1, 10));
        quick.exit_time = Some(at(1, 10));
        let mut four = trade("four", dec!(1));
        four.entry_time = Some(at(1, 0));
        four.exit_time = Some(at(1, 4));
        let mut day = trade("day", dec!(1));
        day.entry_time = Some(at(1, 0));
        day.exit_time = Some(at(2, 0));
        let undated = trade("undated", dec!(1));

        let dim = HoldingTime::new(dec!(2));
        assert_eq!(dim.bucket_of(&quick), 0);
        assert_eq!(dim.bucket_of(&four), 2);
        assert_eq!(dim.bucket_of(&day), 4);
        assert_eq!(dim.bucket_of(&undated), 1);
        assert!(HoldingTime::is_estimated(&undated));
        assert!(!HoldingTime::is_estimated(&quick));
    }

    #[test]
    fn hour_and_weekday_respect_offset() {
        let mut t = trade("t", dec!(1));
        // Monday 23:00 UTC is Tuesday 01:00 at UTC+2.
        t.entry_time = Some(at(1, 23));
        t.exit_time = t.entry_time;

        assert_eq!(HourOfDay::new(Utc.fix()).bucket_of(&t), 23);
        assert_eq!(DayOfWeek::new(Utc.fix()).bucket_of(&t), 1);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(HourOfDay::new(plus_two).bucket_of(&t), 1);
        assert_eq!(DayOfWeek::new(plus_two).bucket_of(&t), 2);

        let undated = trade("u", dec!(1));
        let hours = HourOfDay::new(Utc.fix());
        assert_eq!(hours.labels()[hours.bucket_of(&undated)], UNKNOWN_BUCKET);
        let days = DayOfWeek::new(Utc.fix());
        assert_eq!(days.labels()[days.bucket_of(&undated)], UNKNOWN_BUCKET);
    }

    #[test]
    fn leverage_ranges() {
        let mut t = trade("t", dec!(1));
        for (leverage, expected) in [
            (dec!(1), 0),
            (dec!(5.5), 0),
            (dec!(6), 1),
            (dec!(10), 1),
            (dec!(11), 2),
            (dec!(25), 2),
            (dec!(26), 3),
            (dec!(125), 3),
        ] {
            t.leverage = leverage;
            assert_eq!(Leverage.bucket_of(&t), expected, "leverage {leverage}");
        }
    }

    #[test]
    fn leverage_labels_are_half_open_ranges() {
        let labels = Leverage.labels();
        let mut t = trade("t", dec!(1));
        for (leverage, label) in [
            (dec!(5.5), "1-6x"),
            (dec!(10.5), "6-11x"),
            (dec!(25.9), "11-26x"),
            (dec!(26), "26x+"),
        ] {
            t.leverage = leverage;
            assert_eq!(labels[Leverage.bucket_of(&t)], label, "leverage {leverage}");
        }
    }

    #[test]
    fn bucket_totals_saturate() {
        let trades = [trade("a", Decimal::MAX), trade("b", Decimal::MAX)];
        let report = reduce(&trades, &Leverage);
        assert_eq!(report.buckets[0].total_pnl, Decimal::MAX);
        assert_eq!(report.buckets[0].count, 2);
    }

    #[test]
    fn size_quintiles_follow_the_traders_distribution() {
        let trades: Vec<Trade> = (1..=10)
            .map(|i| {
                let mut t = trade(&i.to_string(), dec!(1));
                t.quantity = Decimal::from(i);
                t
            })
            .collect();
        // Margins 100..=1000; rank = 9 * q.
        let size = SizeQuintiles::from_trades(&trades);
        assert_eq!(
            size.cut_points(),
            [dec!(280), dec!(460), dec!(640), dec!(820)]
        );

        let report = reduce(&trades, &size);
        assert_eq!(counts(&report), [2, 2, 2, 2, 2]);
    }

    #[test]
    fn identical_sizes_share_one_quintile() {
        let trades = [trade("1", dec!(1)), trade("2", dec!(1)), trade("3", dec!(1))];
        let report = reduce(&trades, &SizeQuintiles::from_trades(&trades));
        assert_eq!(counts(&report), [3, 0, 0, 0, 0]);
    }

    #[test]
    fn every_dimension_partitions_the_trade_set() {
        let mut trades = Vec::new();
        for i in 0..23u32 {
            let mut t = trade(&i.to_string(), Decimal::from(i as i64 - 11));
            t.symbol = ["BTCUSDT", "ETHUSDT", "SOLUSDT"][i as usize % 3].to_string();
            t.leverage = Decimal::from(1 + i * 2);
            t.quantity = Decimal::from(1 + i % 5);
            if i % 4 != 0 {
                t.entry_time = Some(at(1 + i % 7, i));
                t.exit_time = Some(at(1 + i % 7, i) + chrono::Duration::minutes(i as i64 * 97));
            }
            trades.push(t);
        }

        let report = bucket_trades(&trades, &BucketSettings::default());
        assert_eq!(report.dimensions.len(), 6);
        for dim in &report.dimensions {
            let total: usize = dim.buckets.iter().map(|b| b.count).sum();
            assert_eq!(total, trades.len(), "{:?}", dim.kind);
            assert_eq!(dim.assignments.len(), trades.len());
        }
        assert_eq!(report.holding_time_estimated, 6);

        let symbols = report.dimension(DimensionKind::Symbol).unwrap();
        let labels: Vec<&str> = symbols.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn empty_trade_set_yields_empty_buckets() {
        let report = bucket_trades(&[], &BucketSettings::default());
        assert_eq!(report.holding_time_estimated, 0);
        assert!(report.size_cut_points.is_empty());
        for dim in &report.dimensions {
            assert_eq!(dim.total_count, 0);
            assert!(dim.buckets.iter().all(|b| b.count == 0));
        }
        assert!(report
            .dimension(DimensionKind::Symbol)
            .unwrap()
            .buckets
            .is_empty());
    }
}
