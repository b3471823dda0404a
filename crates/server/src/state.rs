//! Shared application state
//!
//! The SQLite connection is not Sync, so the handle lives behind an async
//! mutex and every handler runs its whole load-mutate-save cycle under the
//! lock. The version check on save stays as a second line of defense for
//! multi-process deployments sharing the database file.

use std::sync::Arc;

use rota_core::{Database, Engine, Error, Result, Room};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(db: Database, engine: Engine) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            engine: Arc::new(engine),
        }
    }

    /// Load a room, apply a mutation, and save it back under the lock.
    pub async fn update_room<T>(
        &self,
        room_id: Uuid,
        f: impl FnOnce(&Engine, &mut Room) -> Result<T>,
    ) -> Result<T> {
        let db = self.db.lock().await;
        let mut versioned = db
            .rooms()
            .load(room_id)?
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;
        let out = f(&self.engine, &mut versioned.room)?;
        db.rooms().save(&versioned.room, versioned.version)?;
        Ok(out)
    }

    /// Load a room for read-only use.
    pub async fn read_room(&self, room_id: Uuid) -> Result<Room> {
        let db = self.db.lock().await;
        let versioned = db
            .rooms()
            .load(room_id)?
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;
        Ok(versioned.room)
    }

    /// Every room the user belongs to.
    pub async fn rooms_for(&self, user_id: Uuid) -> Result<Vec<Room>> {
        let db = self.db.lock().await;
        db.rooms().rooms_for_member(user_id)
    }

    /// Find the room (among the caller's rooms) containing a request.
    pub async fn room_with_request(&self, caller: Uuid, request_id: Uuid) -> Result<Uuid> {
        let db = self.db.lock().await;
        for room_id in db.rooms().room_ids_for_member(caller)? {
            if let Some(versioned) = db.rooms().load(room_id)? {
                if versioned.room.request(request_id).is_some() {
                    return Ok(room_id);
                }
            }
        }
        Err(Error::NotFound(format!("request {request_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_core::{AvailabilityEntry, Member, Weekday};

    fn sample_room() -> Room {
        let owner = Member::new(Uuid::new_v4(), "Owner".into())
            .with_availability(vec![AvailabilityEntry::recurring(Weekday::Mon, 480, 1080)]);
        Room::new("Studio".into(), owner)
    }

    #[tokio::test]
    async fn test_update_room_persists_mutation() {
        let state = AppState::new(Database::open_in_memory().unwrap(), Engine::default());
        let room = sample_room();
        let room_id = room.id;
        state.db.lock().await.rooms().create(&room).unwrap();

        state
            .update_room(room_id, |_, room| {
                room.name = "Renamed".into();
                Ok(())
            })
            .await
            .unwrap();

        let loaded = state.read_room(room_id).await.unwrap();
        assert_eq!(loaded.name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_missing_room_is_not_found() {
        let state = AppState::new(Database::open_in_memory().unwrap(), Engine::default());
        let err = state
            .update_room(Uuid::new_v4(), |_, _| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_mutation_is_not_saved() {
        let state = AppState::new(Database::open_in_memory().unwrap(), Engine::default());
        let room = sample_room();
        let room_id = room.id;
        state.db.lock().await.rooms().create(&room).unwrap();

        let err = state
            .update_room(room_id, |_, room| {
                room.name = "Should not persist".into();
                Err::<(), _>(Error::validation("nope"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let loaded = state.read_room(room_id).await.unwrap();
        assert_eq!(loaded.name, "Studio");
    }
}
