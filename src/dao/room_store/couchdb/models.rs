use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{RoomEntity, RoomListItemEntity};

pub const ROOM_PREFIX: &str = "room::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Room as stored in CouchDB: the entity plus CouchDB's `_id`/`_rev` pair.
///
/// `_rev` is CouchDB's own MVCC token; `room.revision` is ours and is what
/// callers compare against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoomDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub room: RoomEntity,
}

impl CouchRoomDocument {
    pub fn new(room: RoomEntity, rev: Option<String>) -> Self {
        Self {
            id: room_doc_id(room.pin),
            rev,
            room,
        }
    }

    pub fn into_entity(self) -> RoomEntity {
        self.room
    }
}

impl From<&CouchRoomDocument> for RoomListItemEntity {
    fn from(doc: &CouchRoomDocument) -> Self {
        RoomListItemEntity::from(&doc.room)
    }
}

pub fn room_doc_id(pin: u32) -> String {
    format!("{ROOM_PREFIX}{pin}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn document_flattens_room_fields() {
        let now = SystemTime::now();
        let room = RoomEntity {
            pin: 42,
            password: "pw".into(),
            categories: vec!["A".into(); 5],
            players: Vec::new(),
            round_letters: "ABCDE".into(),
            round_results: Vec::new(),
            ballots: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 3,
        };
        let value = serde_json::to_value(CouchRoomDocument::new(room.clone(), None)).unwrap();
        assert_eq!(value["_id"], "room::42");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["revision"], 3);

        let parsed: CouchRoomDocument = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.into_entity(), room);
    }
}
