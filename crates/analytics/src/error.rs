use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Calculation error: '{0}' does not fit in a decimal")]
    Overflow(&'static str),
}
