use thiserror::Error;

/// Opaque failure from the external store. Passed through to callers
/// without reinterpretation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
