#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{RoomEntity, RoomListItemEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use memory::MemoryRoomStore;

/// Abstraction over the persistence layer for rooms.
///
/// Writes after creation go through [`RoomStore::replace_room`], which only
/// succeeds when the stored revision still equals `room.revision`.
pub trait RoomStore: Send + Sync {
    /// Store a new room. Fails with `AlreadyExists` when the PIN is taken.
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a room by PIN.
    fn find_room(&self, pin: u32) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Compare-and-swap the room, returning the revision now stored.
    fn replace_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<u64>>;
    /// Summaries of every stored room.
    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomListItemEntity>>>;
    /// Cheap round-trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
