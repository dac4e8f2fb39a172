use std::time::SystemTime;

use tracing::debug;

use crate::{
    dao::models::RoomEntity,
    error::ServiceError,
    state::{
        SharedState,
        room::{Room, RoomPin},
    },
};

/// Read a room from the store.
pub async fn load_room(state: &SharedState, pin: RoomPin) -> Result<Room, ServiceError> {
    let store = state.require_room_store().await?;
    let entity = state
        .with_store_timeout(async { Ok(store.find_room(pin.get()).await?) })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room {pin} not found")))?;
    Room::try_from(entity)
}

/// Read `pin`, apply `mutate` and write the room back with a revision check.
///
/// Nothing is written when `mutate` fails. A concurrent writer that committed
/// first turns this write into [`ServiceError::Conflict`]. On success the
/// returned room carries the new revision.
pub async fn mutate_room<F, T>(
    state: &SharedState,
    pin: RoomPin,
    mutate: F,
) -> Result<(T, Room), ServiceError>
where
    F: FnOnce(&mut Room) -> Result<T, ServiceError>,
{
    let mut room = load_room(state, pin).await?;
    let read_revision = room.revision;

    let outcome = mutate(&mut room)?;
    room.updated_at = SystemTime::now();

    let store = state.require_room_store().await?;
    let entity = RoomEntity::from(&room);
    room.revision = state
        .with_store_timeout(async { Ok(store.replace_room(entity).await?) })
        .await?;

    debug!(pin = %pin, from = read_revision, to = room.revision, "room committed");
    Ok((outcome, room))
}
