use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt entry {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for smile_core::SmileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { key, source } => smile_core::SmileError::CorruptProfile {
                session_id: key,
                reason: source.to_string(),
            },
            other => smile_core::SmileError::Storage(other.to_string()),
        }
    }
}
