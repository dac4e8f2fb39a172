use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert room {pin}")]
    InsertRoom {
        pin: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to replace room {pin}")]
    ReplaceRoom {
        pin: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to load room {pin}")]
    LoadRoom {
        pin: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to list rooms")]
    ListRooms {
        #[source]
        source: MongoError,
    },
    #[error("stored room document `{id}` is invalid: {reason}")]
    InvalidDocument { id: i64, reason: &'static str },
    #[error("room {pin} already exists")]
    DuplicatePin { pin: u32 },
    #[error("room {pin} does not exist")]
    RoomMissing { pin: u32 },
    #[error("room {pin} is at revision {actual}, expected {expected}")]
    StaleRevision { pin: u32, expected: u64, actual: u64 },
}
