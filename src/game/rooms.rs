//! Room Partitioner - derived per-room views over the player store

use std::collections::BTreeMap;

use serde::Serialize;

use super::player::{ConnectionId, PlayerRecord};
use super::store::PlayerStore;

/// A room tag and how many players it currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room: String,
    pub players: usize,
}

/// Read-only partition of a store by room. Holds no state of its own.
#[derive(Clone, Copy)]
pub struct Rooms<'a> {
    store: &'a PlayerStore,
}

impl<'a> Rooms<'a> {
    pub fn new(store: &'a PlayerStore) -> Self {
        Self { store }
    }

    /// Every record in `room`
    pub fn members(&self, room: &str) -> Vec<PlayerRecord> {
        self.store.all_in_room(room).cloned().collect()
    }

    /// Every record in `room` except `id`'s own
    pub fn members_excluding(&self, room: &str, id: ConnectionId) -> Vec<PlayerRecord> {
        self.store
            .all_in_room(room)
            .filter(|p| p.id != id)
            .cloned()
            .collect()
    }

    /// Non-empty rooms sorted by tag
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for player in self.store.iter() {
            *counts.entry(player.room.as_str()).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(room, players)| RoomSummary {
                room: room.to_string(),
                players,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (PlayerStore, Vec<ConnectionId>) {
        let mut store = PlayerStore::new();
        let mut ids = Vec::new();
        for (name, room) in [("Alice", "r1"), ("Bob", "r1"), ("Cara", "r2"), ("Dan", "r1")] {
            let id = ConnectionId::new();
            store.create(name, room, id).unwrap();
            ids.push(id);
        }
        (store, ids)
    }

    #[test]
    fn members_excluding_omits_self_and_other_rooms() {
        let (store, ids) = seeded();
        let rooms = Rooms::new(&store);

        for id in &ids {
            let room = store.get(*id).unwrap().room.clone();
            let others = rooms.members_excluding(&room, *id);

            assert!(others.iter().all(|p| p.id != *id));
            assert!(others.iter().all(|p| p.room == room));
        }

        let others: Vec<String> = rooms
            .members_excluding("r1", ids[0])
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(others, vec!["Bob", "Dan"]);
    }

    #[test]
    fn removed_player_leaves_room() {
        let (mut store, ids) = seeded();
        store.remove(ids[1]);

        let rooms = Rooms::new(&store);
        assert!(rooms.members("r1").iter().all(|p| p.id != ids[1]));
        assert_eq!(rooms.members("r1").len(), 2);
    }

    #[test]
    fn empty_rooms_do_not_exist() {
        let (mut store, ids) = seeded();
        store.remove(ids[2]);

        let summaries = Rooms::new(&store).summaries();
        assert_eq!(
            summaries,
            vec![RoomSummary {
                room: "r1".into(),
                players: 3
            }]
        );
        assert!(Rooms::new(&store).members("r2").is_empty());
    }
}
