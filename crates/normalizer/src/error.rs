use analytics::AnalyticsError;
use serde::Serialize;
use thiserror::Error;

/// Failures that abort a whole normalization pass.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Trade collection must be a JSON array or object, got {0}")]
    InvalidCollection(&'static str),

    #[error("Unknown canonical field '{field}' in alias overrides for source '{source_name}'")]
    UnknownAliasField { source_name: String, field: String },
}

/// Why a single raw record was left out of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RejectionReason {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("collection entry is not a record")]
    NotARecord,

    #[error("numeric overflow computing {0}")]
    NumericOverflow(&'static str),
}

impl From<AnalyticsError> for RejectionReason {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::Overflow(field) => RejectionReason::NumericOverflow(field),
        }
    }
}
