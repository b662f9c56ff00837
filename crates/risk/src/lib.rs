//! Risk metrics over a closed trade set: how much margin a trader commits and
//! how hard the losing trades hit.

pub mod analyzer;

pub use analyzer::{RiskAnalyzer, RiskReport, TradeRisk};
