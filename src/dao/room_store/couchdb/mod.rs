mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchRoomStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::RoomExists { pin } => StorageError::AlreadyExists { pin },
            CouchDaoError::StaleRevision {
                pin,
                expected,
                actual,
            } => StorageError::RevisionConflict {
                pin,
                expected,
                actual,
            },
            CouchDaoError::RoomMissing { pin } => StorageError::Missing { pin },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
