//! Player records and identity rules

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health every player spawns with
pub const STARTING_HEALTH: i32 = 100;

/// Damage dealt per hit by a freshly spawned player
pub const STARTING_DAMAGE: i32 = 1;

/// Longest accepted display name (in characters)
pub const MAX_NAME_LEN: usize = 32;

/// Longest accepted room tag (in characters)
pub const MAX_ROOM_LEN: usize = 64;

/// Rooms must not contain this character
pub const ROOM_SEPARATOR: char = '/';

/// Opaque identity of a live connection, stable for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fixed palette a player's color is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Orange,
}

impl PlayerColor {
    pub const PALETTE: [PlayerColor; 6] = [
        PlayerColor::Red,
        PlayerColor::Green,
        PlayerColor::Blue,
        PlayerColor::Yellow,
        PlayerColor::Purple,
        PlayerColor::Orange,
    ];

    /// Uniformly pick a palette entry
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::PALETTE[rng.gen_range(0..Self::PALETTE.len())]
    }
}

/// Authoritative per-connection game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: ConnectionId,
    pub name: String,
    /// Fixed at creation; a player changes rooms only by reconnecting
    pub room: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub health: i32,
    pub damage: i32,
    pub color: PlayerColor,
}

impl PlayerRecord {
    pub fn new(id: ConnectionId, name: String, room: String, color: PlayerColor) -> Self {
        Self {
            id,
            name,
            room,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            health: STARTING_HEALTH,
            damage: STARTING_DAMAGE,
            color,
        }
    }

    pub fn is_eliminated(&self) -> bool {
        self.health <= 0
    }

    /// Overwrite every mutable field. `id` and `room` never change.
    pub fn apply(&mut self, update: &PlayerUpdate) {
        self.name = update.name.clone();
        self.x = update.x;
        self.y = update.y;
        self.z = update.z;
        self.health = update.health;
        self.damage = update.damage;
        self.color = update.color;
    }
}

/// Client-reported snapshot of the mutable fields of a record.
///
/// Clients send their whole record back; `id` and `room` are accepted on the
/// wire but ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub health: i32,
    pub damage: i32,
    pub color: PlayerColor,
}

/// Reasons a `(name, room)` claim is refused before touching the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name is longer than {} characters", MAX_NAME_LEN)]
    NameTooLong,

    #[error("room must not be empty")]
    EmptyRoom,

    #[error("room is longer than {} characters", MAX_ROOM_LEN)]
    RoomTooLong,

    #[error("room must not contain '{}'", ROOM_SEPARATOR)]
    RoomSeparator,
}

/// Trim and validate a claimed identity, returning the normalized pair
pub fn normalize_identity(name: &str, room: &str) -> Result<(String, String), IdentityError> {
    let name = name.trim();
    let room = room.trim();

    if name.is_empty() {
        return Err(IdentityError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(IdentityError::NameTooLong);
    }
    if room.is_empty() {
        return Err(IdentityError::EmptyRoom);
    }
    if room.chars().count() > MAX_ROOM_LEN {
        return Err(IdentityError::RoomTooLong);
    }
    if room.contains(ROOM_SEPARATOR) {
        return Err(IdentityError::RoomSeparator);
    }

    Ok((name.to_string(), room.to_string()))
}
