//! # Journal Analytics Engine
//!
//! This crate turns canonical trades into performance metrics. It acts as the
//! "unbiased judge" of a trader's journal.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O and no knowledge of where trades come from. It
//!   depends only on `core-types` and the bucketing section of `configuration`.
//! - **Stateless Calculation:** Every entry point is a function of its inputs.
//!   Changing the trade set means calling it again; nothing is cached.
//!
//! ## Public API
//!
//! - [`pnl`]: per-trade profit and loss, with division guards.
//! - `AnalyticsEngine`: equity curve, drawdown and the `PerformanceReport`.
//! - [`buckets`]: the generic group-by reducer and its built-in dimensions.
//! - `StreakDetector`: consecutive win/loss runs.

// Declare the modules that constitute this crate.
pub mod buckets;
pub mod engine;
pub mod error;
pub mod pnl;
pub mod report;
pub mod streaks;

#[cfg(test)]
mod fixtures;

// Re-export the key components to create a clean, public-facing API.
pub use buckets::{
    BucketStats, BucketingReport, Dimension, DimensionKind, DimensionReport, UNKNOWN_BUCKET,
    bucket_trades, reduce, reduce_with,
};
pub use engine::{AnalyticsEngine, chronological, drawdown_series, equity_curve};
pub use error::AnalyticsError;
pub use pnl::{Pnl, PnlInputs, compute_pnl, resolve_pnl};
pub use report::{DrawdownPoint, EquityPoint, PerformanceReport};
pub use streaks::{Streak, StreakDetector, StreakReport};
