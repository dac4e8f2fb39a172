mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoRoomStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicatePin { pin } => StorageError::AlreadyExists { pin },
            MongoDaoError::StaleRevision {
                pin,
                expected,
                actual,
            } => StorageError::RevisionConflict {
                pin,
                expected,
                actual,
            },
            MongoDaoError::RoomMissing { pin } => StorageError::Missing { pin },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
