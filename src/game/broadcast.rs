//! Broadcast Engine - full-room state fan-out

use tracing::{debug, warn};

use crate::ws::protocol::ServerMsg;

use super::player::ConnectionId;
use super::registry::{ConnectionRegistry, DeliveryError, RoomView};
use super::rooms::Rooms;
use super::store::PlayerStore;

/// Delivery counts for one broadcast cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members the cycle addressed
    pub recipients: usize,
    /// Views published successfully
    pub delivered: usize,
    /// Members whose connection was already closed or unknown
    pub failed: usize,
}

impl BroadcastReport {
    fn record(&mut self, result: Result<(), DeliveryError>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Publish every member of `room` its own record and the rest of the room.
///
/// Always a full refresh; nothing is diffed against earlier cycles. The view
/// replaces any the member has not read yet, so a slow reader still ends on the
/// latest state. A failure for one member never stops delivery to the others.
pub fn broadcast_room(
    store: &PlayerStore,
    connections: &ConnectionRegistry,
    room: &str,
) -> BroadcastReport {
    let rooms = Rooms::new(store);
    let mut report = BroadcastReport::default();

    for member in store.all_in_room(room) {
        report.recipients += 1;

        let view = RoomView::Member {
            player: member.clone(),
            roster: rooms.members_excluding(room, member.id),
        };

        report.record(publish(connections, member.id, view));
    }

    if report.failed > 0 {
        debug!(
            room = %room,
            recipients = report.recipients,
            failed = report.failed,
            "Broadcast skipped closed connections"
        );
    }

    report
}

/// Replace the room view owed to one connection, logging (never propagating) failure
pub fn publish(
    connections: &ConnectionRegistry,
    id: ConnectionId,
    view: RoomView,
) -> Result<(), DeliveryError> {
    let result = connections.publish(id, view);
    if let Err(e) = &result {
        debug!(connection_id = %id, error = %e, "Dropping view for gone connection");
    }
    result
}

/// Queue a message for one connection, logging (never propagating) failure
pub fn deliver(
    connections: &ConnectionRegistry,
    id: ConnectionId,
    msg: ServerMsg,
) -> Result<(), DeliveryError> {
    let result = connections.send(id, msg);
    match result {
        Ok(()) => {}
        Err(DeliveryError::Full) => {
            warn!(connection_id = %id, "Event queue full, dropping message");
        }
        Err(e) => {
            debug!(connection_id = %id, error = %e, "Dropping message for gone connection");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::registry::Outbox;

    fn drain(outbox: &mut Outbox) -> Vec<ServerMsg> {
        std::iter::from_fn(|| outbox.try_recv()).collect()
    }

    #[test]
    fn each_member_gets_self_then_others() {
        let connections = ConnectionRegistry::new(8);
        let mut store = PlayerStore::new();
        let (alice, mut rx_alice) = connections.register();
        let (bob, mut rx_bob) = connections.register();
        let (cara, mut rx_cara) = connections.register();
        store.create("Alice", "r1", alice).unwrap();
        store.create("Bob", "r1", bob).unwrap();
        store.create("Cara", "r2", cara).unwrap();

        let report = broadcast_room(&store, &connections, "r1");

        assert_eq!(
            report,
            BroadcastReport {
                recipients: 2,
                delivered: 2,
                failed: 0
            }
        );

        let to_alice = drain(&mut rx_alice);
        assert_eq!(to_alice.len(), 2);
        assert!(matches!(&to_alice[0], ServerMsg::SelfState { player } if player.id == alice));
        match &to_alice[1] {
            ServerMsg::RoomRoster { players } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, bob);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(drain(&mut rx_bob).len(), 2);
        assert!(drain(&mut rx_cara).is_empty());
    }

    #[test]
    fn closed_peer_does_not_block_others() {
        let connections = ConnectionRegistry::new(8);
        let mut store = PlayerStore::new();
        let (gone, rx_gone) = connections.register();
        let (bob, mut rx_bob) = connections.register();
        store.create("Gone", "r1", gone).unwrap();
        store.create("Bob", "r1", bob).unwrap();
        drop(rx_gone);

        let report = broadcast_room(&store, &connections, "r1");

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(drain(&mut rx_bob).len(), 2);
    }

    #[test]
    fn unread_cycles_are_replaced_by_the_latest() {
        let connections = ConnectionRegistry::new(1);
        let mut store = PlayerStore::new();
        let (alice, mut rx_alice) = connections.register();
        let (bob, _rx_bob) = connections.register();
        store.create("Alice", "r1", alice).unwrap();
        store.create("Bob", "r1", bob).unwrap();

        for _ in 0..50 {
            broadcast_room(&store, &connections, "r1");
        }
        store.remove(bob);
        broadcast_room(&store, &connections, "r1");

        let to_alice = drain(&mut rx_alice);
        assert_eq!(to_alice.len(), 2);
        assert!(matches!(&to_alice[1], ServerMsg::RoomRoster { players } if players.is_empty()));
    }

    #[test]
    fn empty_room_sends_nothing() {
        let connections = ConnectionRegistry::new(8);
        let store = PlayerStore::new();

        assert_eq!(
            broadcast_room(&store, &connections, "nowhere"),
            BroadcastReport::default()
        );
    }
}
