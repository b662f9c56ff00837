use core_types::CoreError;
use normalizer::NormalizeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Trade '{id}' is not a valid canonical trade: {source}")]
    InvalidTrade {
        id: String,
        #[source]
        source: CoreError,
    },
}
