use analytics::{BucketingReport, PerformanceReport, StreakReport};
use confluence::ConfluenceReport;
use core_types::{CandleSeries, Trade};
use normalizer::NormalizationSummary;
use risk::RiskReport;
use serde::Serialize;

/// Everything computed for one trade set.
#[derive(Debug, Clone, Serialize)]
pub struct JournalReport {
    pub normalization: NormalizationSummary,
    /// Canonical trades in input order.
    pub trades: Vec<Trade>,
    pub performance: PerformanceReport,
    pub buckets: BucketingReport,
    pub streaks: StreakReport,
    pub risk: RiskReport,
    /// Scores follow chronological order, the same order as the equity curve.
    pub confluence: ConfluenceReport,
    /// Candle series supplied for trade replay, passed through untouched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replay: Vec<CandleSeries>,
}
