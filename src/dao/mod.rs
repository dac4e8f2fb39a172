/// Database model definitions.
pub mod models;
/// Room persistence backends.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
