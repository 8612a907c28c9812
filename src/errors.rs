/// Domain-specific error types for kgrec
///
/// Input validation errors are returned to the caller; a corrupt catalog is
/// fatal at load time. A failed submit never mutates learner state and a
/// failed import never registers a learner.

#[derive(Debug, thiserror::Error)]
pub enum RecError {
    #[error("Unknown learner: {0}")]
    UnknownLearner(String),

    #[error("Learner already exists: {0}")]
    AlreadyExists(String),

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Unknown knowledge point: {0}")]
    UnknownKp(String),

    #[error("Invalid option letter '{0}': expected A, B, C or D")]
    BadLetter(String),

    #[error("Answer batch is empty")]
    EmptyBatch,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Snapshot vector has dimension {found}, catalog dimension is {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Corrupt catalog: {0}")]
    CorruptCatalog(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for RecError {
    fn from(e: std::io::Error) -> Self {
        RecError::Storage(e.to_string())
    }
}

impl From<csv::Error> for RecError {
    fn from(e: csv::Error) -> Self {
        RecError::CorruptCatalog(e.to_string())
    }
}
