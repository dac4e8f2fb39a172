use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::dao::{
    models::{RoomEntity, RoomListItemEntity},
    room_store::RoomStore,
    storage::{StorageError, StorageResult},
};

/// Process-local room store backed by a [`DashMap`].
///
/// Each shard lock makes the revision check and the write atomic for one PIN.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    rooms: Arc<DashMap<u32, RoomEntity>>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, room: RoomEntity) -> StorageResult<()> {
        match self.rooms.entry(room.pin) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists { pin: room.pin }),
            Entry::Vacant(slot) => {
                slot.insert(room);
                Ok(())
            }
        }
    }

    fn replace(&self, mut room: RoomEntity) -> StorageResult<u64> {
        let pin = room.pin;
        let Some(mut stored) = self.rooms.get_mut(&pin) else {
            return Err(StorageError::Missing { pin });
        };
        if stored.revision != room.revision {
            return Err(StorageError::RevisionConflict {
                pin,
                expected: room.revision,
                actual: stored.revision,
            });
        }
        room.revision += 1;
        let revision = room.revision;
        *stored = room;
        Ok(revision)
    }

    fn list(&self) -> Vec<RoomListItemEntity> {
        let mut rooms: Vec<RoomListItemEntity> = self
            .rooms
            .iter()
            .map(|entry| RoomListItemEntity::from(entry.value()))
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        rooms
    }
}

impl RoomStore for MemoryRoomStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.insert(room);
        Box::pin(async move { result })
    }

    fn find_room(&self, pin: u32) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let room = self.rooms.get(&pin).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(room) })
    }

    fn replace_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<u64>> {
        let result = self.replace(room);
        Box::pin(async move { result })
    }

    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomListItemEntity>>> {
        let rooms = self.list();
        Box::pin(async move { Ok(rooms) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
