//! Connection Registry - outbound channels for every live connection.
//!
//! Each connection has two lanes. Room state goes through a `watch` slot that
//! only keeps the newest view, so a slow reader skips straight to the current
//! room instead of replaying stale ones. One-shot replies (welcome, pong,
//! rejections, errors) go through a small bounded queue.

use std::collections::VecDeque;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};

use crate::ws::protocol::ServerMsg;

use super::player::{ConnectionId, PlayerRecord};

/// Why a message could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection is not registered")]
    Unknown,

    #[error("outbound queue is full")]
    Full,

    #[error("connection is closed")]
    Closed,
}

/// Latest room state owed to one connection
#[derive(Debug, Clone, PartialEq)]
pub enum RoomView {
    /// No record, nothing to show
    Idle,
    /// Own record plus everyone else in the room
    Member {
        player: PlayerRecord,
        roster: Vec<PlayerRecord>,
    },
    /// Record was removed by a lethal hit
    Eliminated,
}

impl RoomView {
    fn into_messages(self) -> Vec<ServerMsg> {
        match self {
            RoomView::Idle => Vec::new(),
            RoomView::Member { player, roster } => vec![
                ServerMsg::SelfState { player },
                ServerMsg::RoomRoster { players: roster },
            ],
            RoomView::Eliminated => vec![ServerMsg::Eliminated],
        }
    }
}

struct Outlet {
    events: mpsc::Sender<ServerMsg>,
    view: watch::Sender<RoomView>,
}

/// Receiving half of a connection's outbound lanes
pub struct Outbox {
    events: mpsc::Receiver<ServerMsg>,
    view: watch::Receiver<RoomView>,
    pending: VecDeque<ServerMsg>,
}

impl Outbox {
    /// Next message if one is ready. Queued events come before the room view.
    pub fn try_recv(&mut self) -> Option<ServerMsg> {
        if let Some(msg) = self.pending.pop_front() {
            return Some(msg);
        }
        if let Ok(msg) = self.events.try_recv() {
            return Some(msg);
        }
        if self.view.has_changed().unwrap_or(false) {
            self.take_view();
        }
        self.pending.pop_front()
    }

    /// Wait for the next message. `None` once the connection is unregistered.
    pub async fn recv(&mut self) -> Option<ServerMsg> {
        loop {
            if let Some(msg) = self.try_recv() {
                return Some(msg);
            }

            let changed = tokio::select! {
                biased;

                event = self.events.recv() => return event,
                changed = self.view.changed() => changed,
            };

            if changed.is_err() {
                return None;
            }
            self.take_view();
        }
    }

    fn take_view(&mut self) {
        let view = self.view.borrow_and_update().clone();
        self.pending.extend(view.into_messages());
    }
}

/// Registry of all live connections
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Outlet>,
    /// Capacity of each connection's event queue
    event_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(event_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            event_capacity: event_capacity.max(1),
        }
    }

    /// Allocate a fresh id and its outbound lanes. Always succeeds.
    pub fn register(&self) -> (ConnectionId, Outbox) {
        let id = ConnectionId::new();
        let (events_tx, events_rx) = mpsc::channel(self.event_capacity);
        let (view_tx, view_rx) = watch::channel(RoomView::Idle);

        self.connections.insert(
            id,
            Outlet {
                events: events_tx,
                view: view_tx,
            },
        );

        let outbox = Outbox {
            events: events_rx,
            view: view_rx,
            pending: VecDeque::new(),
        };
        (id, outbox)
    }

    /// Forget a connection; unknown ids are ignored
    pub fn unregister(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Queue a one-shot event for `id` without waiting on the peer
    pub fn send(&self, id: ConnectionId, msg: ServerMsg) -> Result<(), DeliveryError> {
        let outlet = self.connections.get(&id).ok_or(DeliveryError::Unknown)?;

        outlet.events.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Replace whatever room view `id` has not read yet
    pub fn publish(&self, id: ConnectionId, view: RoomView) -> Result<(), DeliveryError> {
        let outlet = self.connections.get(&id).ok_or(DeliveryError::Unknown)?;

        if outlet.view.is_closed() {
            return Err(DeliveryError::Closed);
        }
        outlet.view.send_replace(view);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}
