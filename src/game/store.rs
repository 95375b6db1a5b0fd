//! Player State Store - authoritative records keyed by connection

use std::collections::HashMap;

use super::player::{normalize_identity, ConnectionId, PlayerColor, PlayerRecord, PlayerUpdate};

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("name '{name}' is already taken in room '{room}'")]
    DuplicateName { name: String, room: String },

    #[error("connection {0} already owns a player")]
    AlreadyClaimed(ConnectionId),

    #[error("no player for connection {0}")]
    NotFound(ConnectionId),
}

/// All live player records.
///
/// Not synchronized on its own; `GameServer` keeps it behind a single lock so
/// every operation here is atomic with respect to the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStore {
    players: HashMap<ConnectionId, PlayerRecord>,
    /// Insertion order of `players`
    order: Vec<ConnectionId>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record for `id` with spawn defaults and a random palette color
    pub fn create(
        &mut self,
        name: &str,
        room: &str,
        id: ConnectionId,
    ) -> Result<PlayerRecord, StoreError> {
        if self.players.contains_key(&id) {
            return Err(StoreError::AlreadyClaimed(id));
        }
        if self.name_taken(name, room, None) {
            return Err(StoreError::DuplicateName {
                name: name.to_string(),
                room: room.to_string(),
            });
        }

        let color = PlayerColor::random(&mut rand::thread_rng());
        let record = PlayerRecord::new(id, name.to_string(), room.to_string(), color);

        self.players.insert(id, record.clone());
        self.order.push(id);

        Ok(record)
    }

    /// Overwrite the mutable fields of `id`'s record.
    ///
    /// Returns `None` for an unknown connection (stale message). A new name that
    /// is invalid or already used in the room is ignored and the current name kept.
    pub fn update(&mut self, id: ConnectionId, update: &PlayerUpdate) -> Option<&PlayerRecord> {
        let room = self.players.get(&id)?.room.clone();

        let name = match normalize_identity(&update.name, &room) {
            Ok((name, _)) if !self.name_taken(&name, &room, Some(id)) => Some(name),
            _ => None,
        };

        let record = self.players.get_mut(&id)?;
        let keep_name = record.name.clone();
        record.apply(update);
        record.name = name.unwrap_or(keep_name);

        Some(record)
    }

    pub fn get(&self, id: ConnectionId) -> Result<&PlayerRecord, StoreError> {
        self.players.get(&id).ok_or(StoreError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ConnectionId) -> Option<&mut PlayerRecord> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    /// Delete `id`'s record; removing twice is harmless
    pub fn remove(&mut self, id: ConnectionId) -> Option<PlayerRecord> {
        let record = self.players.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(record)
    }

    /// Records in `room`, in insertion order
    pub fn all_in_room<'a>(&'a self, room: &'a str) -> impl Iterator<Item = &'a PlayerRecord> + 'a {
        self.iter().filter(move |p| p.room == room)
    }

    /// Every record in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> + '_ {
        self.order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn name_taken(&self, name: &str, room: &str, except: Option<ConnectionId>) -> bool {
        self.players
            .values()
            .any(|p| p.name == name && p.room == room && Some(p.id) != except)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_named(name: &str) -> PlayerUpdate {
        PlayerUpdate {
            name: name.to_string(),
            x: 4.0,
            y: 5.0,
            z: 6.0,
            health: 90,
            damage: 3,
            color: PlayerColor::Purple,
        }
    }

    #[test]
    fn create_assigns_defaults() {
        let mut store = PlayerStore::new();
        let id = ConnectionId::new();

        let record = store.create("Alice", "r1", id).unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.health, 100);
        assert_eq!(record.damage, 1);
        assert_eq!((record.x, record.y, record.z), (0.0, 0.0, 0.0));
        assert!(PlayerColor::PALETTE.contains(&record.color));
        assert_eq!(store.get(id).unwrap(), &record);
    }

    #[test]
    fn duplicate_name_in_room_is_rejected_without_change() {
        let mut store = PlayerStore::new();
        store.create("Alice", "r1", ConnectionId::new()).unwrap();
        let before = store.clone();

        let err = store.create("Alice", "r1", ConnectionId::new()).unwrap_err();

        assert_eq!(
            err,
            StoreError::DuplicateName {
                name: "Alice".into(),
                room: "r1".into()
            }
        );
        assert_eq!(store, before);
    }

    #[test]
    fn same_name_in_other_room_is_fine() {
        let mut store = PlayerStore::new();
        store.create("Alice", "r1", ConnectionId::new()).unwrap();
        store.create("Alice", "r2", ConnectionId::new()).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn name_frees_up_after_remove() {
        let mut store = PlayerStore::new();
        let first = ConnectionId::new();
        store.create("Alice", "r1", first).unwrap();
        store.remove(first);

        assert!(store.create("Alice", "r1", ConnectionId::new()).is_ok());
    }

    #[test]
    fn one_record_per_connection() {
        let mut store = PlayerStore::new();
        let id = ConnectionId::new();
        store.create("Alice", "r1", id).unwrap();

        assert_eq!(
            store.create("Other", "r2", id),
            Err(StoreError::AlreadyClaimed(id))
        );
    }

    #[test]
    fn update_overwrites_mutable_fields() {
        let mut store = PlayerStore::new();
        let id = ConnectionId::new();
        store.create("Alice", "r1", id).unwrap();

        store.update(id, &update_named("Alicia"));

        let record = store.get(id).unwrap();
        assert_eq!(record.name, "Alicia");
        assert_eq!(record.room, "r1");
        assert_eq!((record.x, record.y, record.z), (4.0, 5.0, 6.0));
        assert_eq!(record.health, 90);
        assert_eq!(record.damage, 3);
        assert_eq!(record.color, PlayerColor::Purple);
    }

    #[test]
    fn update_keeps_name_when_it_would_collide() {
        let mut store = PlayerStore::new();
        let alice = ConnectionId::new();
        store.create("Alice", "r1", alice).unwrap();
        let bob = ConnectionId::new();
        store.create("Bob", "r1", bob).unwrap();

        store.update(bob, &update_named("Alice"));

        assert_eq!(store.get(bob).unwrap().name, "Bob");
        assert_eq!(store.get(bob).unwrap().health, 90);
    }

    #[test]
    fn update_for_unknown_connection_is_ignored() {
        let mut store = PlayerStore::new();
        store.create("Alice", "r1", ConnectionId::new()).unwrap();
        let before = store.clone();

        assert!(store.update(ConnectionId::new(), &update_named("Ghost")).is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = PlayerStore::new();
        let id = ConnectionId::new();
        store.create("Alice", "r1", id).unwrap();

        assert!(store.remove(id).is_some());
        assert!(store.remove(id).is_none());
        assert_eq!(store.get(id), Err(StoreError::NotFound(id)));
        assert_eq!(store.all_in_room("r1").count(), 0);
    }

    #[test]
    fn all_in_room_is_insertion_ordered() {
        let mut store = PlayerStore::new();
        for name in ["c", "a", "b"] {
            store.create(name, "r1", ConnectionId::new()).unwrap();
        }
        store.create("z", "r2", ConnectionId::new()).unwrap();

        let names: Vec<&str> = store.all_in_room("r1").map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
