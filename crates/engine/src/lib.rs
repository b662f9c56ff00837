//! # Journal Engine
//!
//! The orchestrator: raw records go in, a `JournalReport` comes out.
//!
//! Normalization and chronological ordering run first. Bucketing, streak
//! detection and risk analysis are independent and run in parallel; the
//! confluence scorer runs last, on top of the bucket statistics. Nothing is
//! kept between calls, so editing a trade means computing again.

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::EngineError;
pub use pipeline::{JournalEngine, compute, compute_trades, compute_with_replay};
pub use report::JournalReport;
