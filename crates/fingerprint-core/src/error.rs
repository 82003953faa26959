//! Error taxonomy for the probe core.
//!
//! Only setup problems end up here. Detection gaps and bad operator input
//! are recovered inside the selector and never surface as errors.

/// Core errors.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid precision: {0} (expected fp16 or bf16)")]
    InvalidPrecision(String),

    #[error("device lister not found: {0}")]
    ListerNotFound(String),

    #[error("device listing failed: {0}")]
    DeviceListing(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
