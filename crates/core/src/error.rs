use thiserror::Error;

pub type SmileResult<T> = Result<T, SmileError>;

#[derive(Error, Debug)]
pub enum SmileError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt profile for session {session_id}: {reason}")]
    CorruptProfile { session_id: String, reason: String },

    #[error("Segment definition error: {0}")]
    SegmentDefinition(String),
}
