use analytics::{
    BucketingReport, DimensionKind, DimensionReport, UNKNOWN_BUCKET, reduce_with,
};
use configuration::{ConfluenceMode, ConfluenceSettings};
use core_types::Trade;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const BAND_LABELS: [&str; 4] = ["0-24", "25-49", "50-74", "75-100"];
const BAND_EDGES: [i64; 3] = [25, 50, 75];

/// Which of a trader's historically favourable conditions a trade met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceFactors {
    pub is_optimal_hour: bool,
    pub is_optimal_day_of_week: bool,
    pub is_top_symbol_performer: bool,
    pub is_optimal_size_bucket: bool,
}

/// The 0-100 score of a single trade and the factors behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceScore {
    pub trade_id: String,
    pub score: Decimal,
    #[serde(flatten)]
    pub factors: ConfluenceFactors,
}

/// Scores for a whole trade set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceReport {
    pub scores: Vec<ConfluenceScore>,
    pub average_score: Decimal,
    /// Trades grouped by score band, with the usual bucket statistics.
    pub bands: DimensionReport,
}

/// Scores trades against the bucket statistics of their own trade set.
pub struct ConfluenceScorer {
    settings: ConfluenceSettings,
}

impl ConfluenceScorer {
    pub fn new(settings: ConfluenceSettings) -> Self {
        Self { settings }
    }

    /// Scores every trade.
    ///
    /// `trades` must be the same slice, in the same order, that `bucketing`
    /// was computed from.
    pub fn score(&self, trades: &[Trade], bucketing: &BucketingReport) -> ConfluenceReport {
        let hours = bucketing.dimension(DimensionKind::HourOfDay);
        let days = bucketing.dimension(DimensionKind::DayOfWeek);
        let symbols = bucketing.dimension(DimensionKind::Symbol);
        let sizes = bucketing.dimension(DimensionKind::SizeQuintile);

        let scores: Vec<ConfluenceScore> = trades
            .iter()
            .enumerate()
            .map(|(i, trade)| {
                let factors = ConfluenceFactors {
                    is_optimal_hour: self.ranks_in_top_k(hours, i, trade, 1),
                    is_optimal_day_of_week: self.ranks_in_top_k(days, i, trade, 1),
                    is_top_symbol_performer: self.ranks_in_top_k(
                        symbols,
                        i,
                        trade,
                        self.settings.min_symbol_trades,
                    ),
                    is_optimal_size_bucket: self.ranks_in_top_k(sizes, i, trade, 1),
                };
                ConfluenceScore {
                    trade_id: trade.id.clone(),
                    score: self.weighted_score(&factors),
                    factors,
                }
            })
            .collect();

        let average_score = if scores.is_empty() {
            Decimal::ZERO
        } else {
            let total: Decimal = scores.iter().map(|s| s.score).sum();
            (total / Decimal::from(scores.len())).round_dp(2)
        };

        let bands = reduce_with(
            DimensionKind::ConfluenceScore,
            trades,
            BAND_LABELS.iter().map(|l| l.to_string()).collect(),
            |i, _| scores.get(i).map_or(0, |s| band_of(s.score)),
        );

        tracing::debug!(
            trades = trades.len(),
            average_score = %average_score,
            mode = ?self.settings.mode,
            "Confluence scores computed."
        );

        ConfluenceReport {
            scores,
            average_score,
            bands,
        }
    }

    /// Whether the trade's own bucket is among the `top_k` by average PnL.
    ///
    /// Only non-empty, known buckets with at least `min_count` trades compete.
    /// In leave-one-out mode the trade's bucket is judged without the trade;
    /// competing buckets never contain it, so their full stats are used.
    fn ranks_in_top_k(
        &self,
        dimension: Option<&DimensionReport>,
        trade_index: usize,
        trade: &Trade,
        min_count: usize,
    ) -> bool {
        let Some(dimension) = dimension else {
            return false;
        };
        let Some((own_index, own)) = dimension.bucket_of_trade(trade_index) else {
            return false;
        };
        if own.label == UNKNOWN_BUCKET {
            return false;
        }

        let min_count = min_count.max(1);
        let (count, total) = match self.settings.mode {
            ConfluenceMode::LeaveOneOut => (
                own.count.saturating_sub(1),
                own.total_pnl.saturating_sub(trade.pnl_usd),
            ),
            ConfluenceMode::FullHistory => (own.count, own.total_pnl),
        };
        if count < min_count {
            return false;
        }
        let own_avg = total / Decimal::from(count);

        let better = dimension
            .buckets
            .iter()
            .enumerate()
            .filter(|(i, b)| {
                *i != own_index
                    && b.count >= min_count
                    && b.label != UNKNOWN_BUCKET
                    && b.avg_pnl > own_avg
            })
            .count();

        better < self.settings.top_k
    }

    fn weighted_score(&self, factors: &ConfluenceFactors) -> Decimal {
        let w = &self.settings.weights;
        let total = w.total();
        if total <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let earned: Decimal = [
            (factors.is_optimal_hour, w.hour),
            (factors.is_optimal_day_of_week, w.day_of_week),
            (factors.is_top_symbol_performer, w.symbol),
            (factors.is_optimal_size_bucket, w.size),
        ]
        .iter()
        .filter(|(met, _)| *met)
        .map(|(_, weight)| *weight)
        .sum();

        (earned / total * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

fn band_of(score: Decimal) -> usize {
    BAND_EDGES
        .iter()
        .position(|edge| score < Decimal::from(*edge))
        .unwrap_or(BAND_EDGES.len())
}
