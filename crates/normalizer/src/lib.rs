//! # Trade Normalizer
//!
//! Converts raw trade records from exchange exports and manual entry into the
//! canonical `Trade` used by every downstream computation.
//!
//! Field names are resolved through alias tables (built-in plus per-exchange
//! overrides from configuration), values through typed parsers that tell an
//! absent field from an unusable one. Records that cannot form a valid trade
//! are rejected with a reason instead of being zero-filled.

pub mod aliases;
pub mod error;
pub mod normalizer;
pub mod parse;

pub use aliases::{AliasTable, CanonicalField, SourceAdapters};
pub use error::{NormalizeError, RejectionReason};
pub use normalizer::{NormalizationSummary, NormalizedBatch, Normalizer, Rejection};
pub use parse::{Parsed, normalize_symbol};
