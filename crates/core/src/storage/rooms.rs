//! Room storage operations
//!
//! Load/save whole room documents. Saves are compare-and-swap on the
//! `version` column: a concurrent writer makes the save fail with
//! `Error::Conflict` instead of silently clobbering interleaved edits.

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::Room;

/// A loaded room together with the version its save must match.
#[derive(Debug)]
pub struct VersionedRoom {
    pub room: Room,
    pub version: i64,
}

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new room at version 1
    #[instrument(skip(self, room), fields(room = %room.id))]
    pub fn create(&self, room: &Room) -> Result<()> {
        crate::invariants::assert_room_invariants(room);
        let document = serde_json::to_string(room)?;
        self.conn.execute(
            "INSERT INTO rooms (id, name, owner_id, version, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
            params![
                room.id.to_string(),
                room.name,
                room.owner_id.to_string(),
                document,
                room.created_at.to_rfc3339(),
                room.updated_at.to_rfc3339(),
            ],
        )?;
        self.refresh_member_index(room)?;
        Ok(())
    }

    /// Load a room document with its current version
    pub fn load(&self, room_id: Uuid) -> Result<Option<VersionedRoom>> {
        let row = self
            .conn
            .query_row(
                "SELECT document, version FROM rooms WHERE id = ?1",
                params![room_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((document, version)) => {
                let room: Room = serde_json::from_str(&document)?;
                Ok(Some(VersionedRoom { room, version }))
            }
            None => Ok(None),
        }
    }

    /// Save a mutated room if nobody else has saved it in the meantime.
    /// Returns the new version on success.
    #[instrument(skip(self, room), fields(room = %room.id, expected_version))]
    pub fn save(&self, room: &Room, expected_version: i64) -> Result<i64> {
        crate::invariants::assert_room_invariants(room);
        let document = serde_json::to_string(room)?;
        let changed = self.conn.execute(
            "UPDATE rooms
             SET name = ?1, owner_id = ?2, document = ?3, updated_at = ?4,
                 version = version + 1
             WHERE id = ?5 AND version = ?6",
            params![
                room.name,
                room.owner_id.to_string(),
                document,
                room.updated_at.to_rfc3339(),
                room.id.to_string(),
                expected_version,
            ],
        )?;

        if changed == 0 {
            // Distinguish a missing row from a lost race
            return match self.load(room.id)? {
                Some(_) => Err(Error::Conflict(room.id.to_string())),
                None => Err(Error::NotFound(format!("room {}", room.id))),
            };
        }

        self.refresh_member_index(room)?;
        Ok(expected_version + 1)
    }

    /// Delete a room document
    pub fn delete(&self, room_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM rooms WHERE id = ?1",
            params![room_id.to_string()],
        )?;
        Ok(())
    }

    /// Ids of all rooms the user belongs to
    pub fn room_ids_for_member(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT room_id FROM room_members WHERE user_id = ?1")?;
        let ids = stmt
            .query_map(params![user_id.to_string()], |row| {
                parse_uuid(&row.get::<_, String>(0)?)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Load every room the user belongs to
    pub fn rooms_for_member(&self, user_id: Uuid) -> Result<Vec<Room>> {
        let mut rooms = Vec::new();
        for id in self.room_ids_for_member(user_id)? {
            if let Some(versioned) = self.load(id)? {
                rooms.push(versioned.room);
            }
        }
        Ok(rooms)
    }

    fn refresh_member_index(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "DELETE FROM room_members WHERE room_id = ?1",
            params![room.id.to_string()],
        )?;
        for member in &room.members {
            self.conn.execute(
                "INSERT OR IGNORE INTO room_members (room_id, user_id) VALUES (?1, ?2)",
                params![room.id.to_string(), member.user_id.to_string()],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityEntry, Member};
    use crate::storage::Database;
    use crate::time::Weekday;

    fn sample_room() -> Room {
        let owner = Member::new(Uuid::new_v4(), "Owner".into())
            .with_availability(vec![AvailabilityEntry::recurring(Weekday::Mon, 480, 1080)]);
        let mut room = Room::new("Studio".into(), owner);
        room.add_member(Member::new(Uuid::new_v4(), "Ann".into()));
        room
    }

    #[test]
    fn test_create_load_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let room = sample_room();
        db.rooms().create(&room).unwrap();

        let loaded = db.rooms().load(room.id).unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.room.id, room.id);
        assert_eq!(loaded.room.members.len(), 2);
        assert_eq!(loaded.room.owner_id, room.owner_id);
    }

    #[test]
    fn test_save_bumps_version() {
        let db = Database::open_in_memory().unwrap();
        let mut room = sample_room();
        db.rooms().create(&room).unwrap();

        room.name = "New Studio".into();
        let v2 = db.rooms().save(&room, 1).unwrap();
        assert_eq!(v2, 2);

        let loaded = db.rooms().load(room.id).unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.room.name, "New Studio");
    }

    #[test]
    fn test_stale_save_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let room = sample_room();
        db.rooms().create(&room).unwrap();
        db.rooms().save(&room, 1).unwrap();

        // A second writer still holding version 1 must not win
        let err = db.rooms().save(&room, 1).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_save_missing_room_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let room = sample_room();
        let err = db.rooms().save(&room, 1).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_cascades_member_index() {
        let db = Database::open_in_memory().unwrap();
        let room = sample_room();
        let ann = room.members[1].user_id;
        db.rooms().create(&room).unwrap();

        db.rooms().delete(room.id).unwrap();
        assert!(db.rooms().load(room.id).unwrap().is_none());
        assert!(db.rooms().room_ids_for_member(ann).unwrap().is_empty());
    }

    #[test]
    fn test_member_index_follows_document() {
        let db = Database::open_in_memory().unwrap();
        let mut room = sample_room();
        let ann = room.members[1].user_id;
        db.rooms().create(&room).unwrap();

        assert_eq!(db.rooms().room_ids_for_member(ann).unwrap(), vec![room.id]);

        room.remove_member(ann);
        db.rooms().save(&room, 1).unwrap();
        assert!(db.rooms().room_ids_for_member(ann).unwrap().is_empty());

        let rooms = db.rooms().rooms_for_member(room.owner_id).unwrap();
        assert_eq!(rooms.len(), 1);
    }
}
