use core_types::{Outcome, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A maximal run of same-outcome trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub outcome: Outcome,
    pub length: usize,
    pub first_trade_id: String,
    pub last_trade_id: String,
}

/// Win/loss runs over a chronological trade sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakReport {
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    /// Streak length -> number of winning streaks of that length.
    pub win_distribution: BTreeMap<usize, usize>,
    /// Streak length -> number of losing streaks of that length.
    pub loss_distribution: BTreeMap<usize, usize>,
    pub average_win_streak: Decimal,
    pub average_loss_streak: Decimal,
    pub total_streaks: usize,
    /// The streak the sequence ends on.
    pub current: Option<Streak>,
    pub streaks: Vec<Streak>,
}

impl StreakReport {
    fn empty() -> Self {
        Self {
            max_win_streak: 0,
            max_loss_streak: 0,
            win_distribution: BTreeMap::new(),
            loss_distribution: BTreeMap::new(),
            average_win_streak: Decimal::ZERO,
            average_loss_streak: Decimal::ZERO,
            total_streaks: 0,
            current: None,
            streaks: Vec::new(),
        }
    }
}

/// Scans chronologically ordered trades for consecutive wins and losses.
#[derive(Debug, Default)]
pub struct StreakDetector {}

impl StreakDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&self, trades: &[Trade]) -> StreakReport {
        let mut report = StreakReport::empty();
        let mut open: Option<Streak> = None;

        for trade in trades {
            let outcome = trade.outcome();
            match open.as_mut() {
                Some(streak) if streak.outcome == outcome => {
                    streak.length += 1;
                    streak.last_trade_id.clone_from(&trade.id);
                }
                _ => {
                    if let Some(closed) = open.take() {
                        report.streaks.push(closed);
                    }
                    open = Some(Streak {
                        outcome,
                        length: 1,
                        first_trade_id: trade.id.clone(),
                        last_trade_id: trade.id.clone(),
                    });
                }
            }
        }
        if let Some(last) = open {
            report.current = Some(last.clone());
            report.streaks.push(last);
        }

        self.summarise(&mut report);
        report
    }

    fn summarise(&self, report: &mut StreakReport) {
        let mut win_lengths = 0usize;
        let mut loss_lengths = 0usize;

        for streak in &report.streaks {
            let (max, distribution, total) = match streak.outcome {
                Outcome::Win => (
                    &mut report.max_win_streak,
                    &mut report.win_distribution,
                    &mut win_lengths,
                ),
                Outcome::Loss => (
                    &mut report.max_loss_streak,
                    &mut report.loss_distribution,
                    &mut loss_lengths,
                ),
            };
            *max = (*max).max(streak.length);
            *distribution.entry(streak.length).or_insert(0) += 1;
            *total += streak.length;
        }

        report.total_streaks = report.streaks.len();
        report.average_win_streak = average(win_lengths, report.win_distribution.values().sum());
        report.average_loss_streak = average(loss_lengths, report.loss_distribution.values().sum());
    }
}

fn average(total_length: usize, streak_count: usize) -> Decimal {
    if streak_count == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(total_length) / Decimal::from(streak_count)
}
