use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed to answer.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable context.
        message: String,
        /// Backend specific failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A room with this PIN is already stored.
    #[error("room {pin} already exists")]
    AlreadyExists {
        /// Conflicting PIN.
        pin: u32,
    },
    /// The stored revision moved since the room was read.
    #[error("room {pin} is at revision {actual}, expected {expected}")]
    RevisionConflict {
        /// PIN of the room being replaced.
        pin: u32,
        /// Revision the writer read.
        expected: u64,
        /// Revision currently stored.
        actual: u64,
    },
    /// The room to replace does not exist.
    #[error("room {pin} does not exist")]
    Missing {
        /// PIN that was looked up.
        pin: u32,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
