//! Session lifecycle - per-connection state machine over the shared store

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::broadcast::{broadcast_room, deliver, publish};
use super::combat::{CombatSystem, ShotOutcome};
use super::player::{normalize_identity, ConnectionId, IdentityError, PlayerRecord, PlayerUpdate};
use super::registry::{ConnectionRegistry, Outbox, RoomView};
use super::rooms::{RoomSummary, Rooms};
use super::store::{PlayerStore, StoreError};

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport is up, no player record yet
    Connected,
    /// Identity claimed, no state update seen yet
    Named,
    /// Sending state updates and shots
    Active,
    /// Left, eliminated or dropped. Terminal.
    Disconnected,
}

/// Why a claim did not produce a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error(transparent)]
    Invalid(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Effect of a state-changing message on the sender's own record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelfEffect {
    Alive,
    Eliminated,
    /// The record was already gone
    Stale,
}

/// Owns the authoritative store and every live connection.
///
/// All store access goes through one lock. Broadcast snapshots are taken while
/// the lock is still held, so each cycle reflects exactly the mutation that
/// triggered it.
pub struct GameServer {
    store: Mutex<PlayerStore>,
    connections: ConnectionRegistry,
}

impl GameServer {
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            store: Mutex::new(PlayerStore::new()),
            connections: ConnectionRegistry::new(outbound_capacity),
        }
    }

    /// Register a new transport connection and greet it
    pub fn connect(self: &Arc<Self>) -> (Session, Outbox) {
        let (id, rx) = self.connections.register();
        let _ = deliver(
            &self.connections,
            id,
            ServerMsg::Welcome {
                connection_id: id,
                server_time: unix_millis(),
            },
        );

        info!(connection_id = %id, "Connection registered");

        let session = Session {
            id,
            phase: SessionPhase::Connected,
            server: Arc::clone(self),
        };
        (session, rx)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn player_count(&self) -> usize {
        self.store.lock().len()
    }

    pub fn player(&self, id: ConnectionId) -> Option<PlayerRecord> {
        self.store.lock().get(id).ok().cloned()
    }

    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        Rooms::new(&self.store.lock()).summaries()
    }

    pub fn room_members(&self, room: &str) -> Vec<PlayerRecord> {
        Rooms::new(&self.store.lock()).members(room)
    }

    pub fn members_excluding(&self, room: &str, id: ConnectionId) -> Vec<PlayerRecord> {
        Rooms::new(&self.store.lock()).members_excluding(room, id)
    }

    fn claim(&self, id: ConnectionId, name: &str, room: &str) -> Result<PlayerRecord, ClaimError> {
        let (name, room) = normalize_identity(name, room)?;

        let mut store = self.store.lock();
        let record = store.create(&name, &room, id)?;
        broadcast_room(&store, &self.connections, &room);

        Ok(record)
    }

    fn update(&self, id: ConnectionId, update: &PlayerUpdate) -> SelfEffect {
        let mut store = self.store.lock();
        let Some(record) = store.update(id, update) else {
            return SelfEffect::Stale;
        };
        let room = record.room.clone();
        let effect = if record.is_eliminated() {
            self.eliminate(&mut store, id);
            SelfEffect::Eliminated
        } else {
            SelfEffect::Alive
        };

        broadcast_room(&store, &self.connections, &room);
        effect
    }

    fn shoot(&self, id: ConnectionId, shooter: &PlayerUpdate, target: ConnectionId) -> SelfEffect {
        let mut store = self.store.lock();
        let Some(record) = store.update(id, shooter) else {
            return SelfEffect::Stale;
        };
        let room = record.room.clone();

        if record.is_eliminated() {
            self.eliminate(&mut store, id);
            broadcast_room(&store, &self.connections, &room);
            return SelfEffect::Eliminated;
        }

        match CombatSystem::resolve_shot(&mut store, id, target) {
            ShotOutcome::Eliminated { hit, record } => {
                info!(
                    room = %hit.room,
                    shooter_id = %hit.shooter_id,
                    target_id = %hit.target_id,
                    target_name = %record.name,
                    "Player eliminated"
                );
                let _ = publish(&self.connections, hit.target_id, RoomView::Eliminated);
            }
            ShotOutcome::Hit(hit) => {
                debug!(
                    shooter_id = %hit.shooter_id,
                    target_id = %hit.target_id,
                    damage = hit.damage,
                    target_health = hit.target_health,
                    "Shot resolved"
                );
            }
            ShotOutcome::Ignored => {
                debug!(shooter_id = %id, target_id = %target, "Shot at absent target ignored");
            }
        }

        broadcast_room(&store, &self.connections, &room);
        SelfEffect::Alive
    }

    fn leave(&self, id: ConnectionId) {
        let mut store = self.store.lock();
        if let Some(record) = store.remove(id) {
            info!(connection_id = %id, name = %record.name, room = %record.room, "Player left");
            let _ = publish(&self.connections, id, RoomView::Idle);
            broadcast_room(&store, &self.connections, &record.room);

            if store.is_empty() {
                debug!("Last player left the server");
            }
        }
    }

    fn has_record(&self, id: ConnectionId) -> bool {
        self.store.lock().contains(id)
    }

    /// Remove `id`'s record and tell that connection it is out
    fn eliminate(&self, store: &mut PlayerStore, id: ConnectionId) {
        if let Some(record) = store.remove(id) {
            info!(connection_id = %id, name = %record.name, room = %record.room, "Player eliminated");
            let _ = publish(&self.connections, id, RoomView::Eliminated);
        }
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new(64)
    }
}

/// One transport connection's view of the game.
///
/// Dropping a session counts as a transport disconnect.
pub struct Session {
    id: ConnectionId,
    phase: SessionPhase,
    server: Arc<GameServer>,
}

impl Session {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Drive the state machine with one inbound message
    pub fn handle(&mut self, msg: ClientMsg) {
        if let ClientMsg::Ping { t } = msg {
            self.reply(ServerMsg::Pong { t });
            return;
        }

        // Another player's shot may have removed our record since the last message
        if matches!(self.phase, SessionPhase::Named | SessionPhase::Active)
            && !self.server.has_record(self.id)
        {
            self.phase = SessionPhase::Disconnected;
        }

        if self.phase == SessionPhase::Disconnected {
            debug!(connection_id = %self.id, "Dropping message for finished session");
            return;
        }

        match msg {
            ClientMsg::ClaimIdentity { name, room } => self.claim(name, room),
            ClientMsg::StateUpdate { player } => {
                if self.require_named() {
                    let effect = self.server.update(self.id, &player);
                    self.settle(effect);
                }
            }
            ClientMsg::ShootIntent { shooter, target } => {
                if self.require_named() {
                    let effect = self.server.shoot(self.id, &shooter, target.id);
                    self.settle(effect);
                }
            }
            ClientMsg::VoluntaryLeave => {
                self.server.leave(self.id);
                self.phase = SessionPhase::Disconnected;
            }
            ClientMsg::Ping { .. } => {}
        }
    }

    /// Report a payload that could not be understood. State is untouched.
    pub fn reject(&self, code: &str, message: impl Into<String>) {
        self.reply(ServerMsg::error(code, message));
    }

    /// Transport is gone: drop the record and forget the connection
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Disconnected {
            self.server.leave(self.id);
            self.phase = SessionPhase::Disconnected;
        }
        if self.server.connections.contains(self.id) {
            self.server.connections.unregister(self.id);
            info!(connection_id = %self.id, "Connection unregistered");
        }
    }

    fn claim(&mut self, name: String, room: String) {
        if self.phase != SessionPhase::Connected {
            self.reject("already_named", "this connection already has an identity");
            return;
        }

        match self.server.claim(self.id, &name, &room) {
            Ok(record) => {
                info!(
                    connection_id = %self.id,
                    name = %record.name,
                    room = %record.room,
                    "Identity claimed"
                );
                self.phase = SessionPhase::Named;
            }
            Err(e) => {
                warn!(connection_id = %self.id, name = %name, room = %room, error = %e, "Identity rejected");
                self.reply(ServerMsg::IdentityRejected {
                    name,
                    room,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn require_named(&self) -> bool {
        if self.phase == SessionPhase::Connected {
            self.reject("not_named", "claim an identity first");
            return false;
        }
        true
    }

    fn settle(&mut self, effect: SelfEffect) {
        self.phase = match effect {
            SelfEffect::Alive => SessionPhase::Active,
            SelfEffect::Eliminated | SelfEffect::Stale => SessionPhase::Disconnected,
        };
    }

    fn reply(&self, msg: ServerMsg) {
        let _ = deliver(&self.server.connections, self.id, msg);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
