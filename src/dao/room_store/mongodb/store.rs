use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoRoomDocument, MongoRoomSummary, doc_id, revision_filter, summary_projection},
};
use crate::dao::{
    models::{RoomEntity, RoomListItemEntity},
    room_store::RoomStore,
    storage::StorageResult,
};

const ROOM_COLLECTION_NAME: &str = "rooms";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("room_created_at_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROOM_COLLECTION_NAME,
                index: "created_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoRoomDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn insert_room(&self, room: RoomEntity) -> MongoResult<()> {
        let pin = room.pin;
        let document = MongoRoomDocument::from(room);
        let collection = self.collection().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicatePin { pin }
                } else {
                    MongoDaoError::InsertRoom { pin, source }
                }
            })?;
        Ok(())
    }

    async fn find_room(&self, pin: u32) -> MongoResult<Option<RoomEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc_id(pin))
            .await
            .map_err(|source| MongoDaoError::LoadRoom { pin, source })?;

        document.map(RoomEntity::try_from).transpose()
    }

    async fn replace_room(&self, mut room: RoomEntity) -> MongoResult<u64> {
        let pin = room.pin;
        let expected = room.revision;
        room.revision = expected + 1;
        let document = MongoRoomDocument::from(room);

        let collection = self.collection().await;
        let result = collection
            .replace_one(revision_filter(pin, expected), &document)
            .await
            .map_err(|source| MongoDaoError::ReplaceRoom { pin, source })?;

        if result.matched_count == 1 {
            return Ok(expected + 1);
        }

        match self.find_room(pin).await? {
            Some(current) => Err(MongoDaoError::StaleRevision {
                pin,
                expected,
                actual: current.revision,
            }),
            None => Err(MongoDaoError::RoomMissing { pin }),
        }
    }

    async fn list_rooms(&self) -> MongoResult<Vec<RoomListItemEntity>> {
        let collection = self.collection().await.clone_with_type::<MongoRoomSummary>();

        let summaries: Vec<MongoRoomSummary> = collection
            .find(doc! {})
            .projection(summary_projection())
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListRooms { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRooms { source })?;

        summaries.into_iter().map(TryInto::try_into).collect()
    }
}

impl RoomStore for MongoRoomStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_room(room).await.map_err(Into::into) })
    }

    fn find_room(&self, pin: u32) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room(pin).await.map_err(Into::into) })
    }

    fn replace_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.replace_room(room).await.map_err(Into::into) })
    }

    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_rooms().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
