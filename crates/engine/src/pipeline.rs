use crate::error::EngineError;
use crate::report::JournalReport;
use analytics::{AnalyticsEngine, StreakDetector, bucket_trades, chronological};
use configuration::EngineConfig;
use confluence::ConfluenceScorer;
use core_types::{CandleSeries, Trade};
use normalizer::{NormalizationSummary, Normalizer};
use risk::RiskAnalyzer;
use serde_json::Value;

/// Runs the full computation for one trade collection.
pub fn compute(records: &Value, config: &EngineConfig) -> Result<JournalReport, EngineError> {
    JournalEngine::new(config.clone())?.run(records, Vec::new())
}

/// Like [`compute`], carrying candle series into the report for replay.
pub fn compute_with_replay(
    records: &Value,
    config: &EngineConfig,
    candles: Vec<CandleSeries>,
) -> Result<JournalReport, EngineError> {
    JournalEngine::new(config.clone())?.run(records, candles)
}

/// Runs the computation for trades that are already canonical.
///
/// Each trade is checked against the canonical invariants first.
pub fn compute_trades(trades: Vec<Trade>, config: &EngineConfig) -> Result<JournalReport, EngineError> {
    for trade in &trades {
        trade.validate().map_err(|source| EngineError::InvalidTrade {
            id: trade.id.clone(),
            source,
        })?;
    }
    let summary = NormalizationSummary {
        accepted: trades.len(),
        ..NormalizationSummary::default()
    };
    Ok(JournalEngine::new(config.clone())?.analyze(trades, summary, Vec::new()))
}

/// A configured pipeline. Holds no results between runs.
#[derive(Debug, Clone)]
pub struct JournalEngine {
    config: EngineConfig,
    normalizer: Normalizer,
}

impl JournalEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let normalizer = Normalizer::new(&config.normalizer)?;
        Ok(Self { config, normalizer })
    }

    /// Normalizes `records` and computes every report over the accepted trades.
    #[tracing::instrument(skip_all, name = "journal_run")]
    pub fn run(
        &self,
        records: &Value,
        candles: Vec<CandleSeries>,
    ) -> Result<JournalReport, EngineError> {
        let batch = self.normalizer.normalize_collection(records)?;
        let (trades, summary) = batch.into_parts();
        Ok(self.analyze(trades, summary, candles))
    }

    fn analyze(
        &self,
        trades: Vec<Trade>,
        normalization: NormalizationSummary,
        replay: Vec<CandleSeries>,
    ) -> JournalReport {
        let ordered = chronological(&trades);
        let performance = AnalyticsEngine::new().calculate(&ordered);

        let (buckets, (streaks, risk)) = rayon::join(
            || bucket_trades(&ordered, &self.config.buckets),
            || {
                rayon::join(
                    || StreakDetector::new().detect(&ordered),
                    || RiskAnalyzer::new().analyze(&ordered),
                )
            },
        );

        let confluence =
            ConfluenceScorer::new(self.config.confluence.clone()).score(&ordered, &buckets);

        tracing::info!(
            trades = ordered.len(),
            net_profit = %performance.total_net_profit,
            dimensions = buckets.dimensions.len(),
            streaks = streaks.total_streaks,
            average_confluence = %confluence.average_score,
            "Journal report computed."
        );

        JournalReport {
            normalization,
            trades,
            performance,
            buckets,
            streaks,
            risk,
            confluence,
            replay,
        }
    }
}
