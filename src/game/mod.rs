//! Room-partitioned game state: records, rooms, combat, fan-out and sessions

pub mod broadcast;
pub mod combat;
pub mod player;
pub mod registry;
pub mod rooms;
pub mod session;
pub mod store;

pub use broadcast::{broadcast_room, BroadcastReport};
pub use combat::{CombatSystem, HitResult, ShotOutcome};
pub use player::{ConnectionId, PlayerColor, PlayerRecord, PlayerUpdate};
pub use registry::{ConnectionRegistry, DeliveryError, Outbox, RoomView};
pub use rooms::{RoomSummary, Rooms};
pub use session::{ClaimError, GameServer, Session, SessionPhase};
pub use store::{PlayerStore, StoreError};
