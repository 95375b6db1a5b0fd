//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{ConnectionId, PlayerRecord, PlayerUpdate};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Claim a display name inside a room
    ClaimIdentity { name: String, room: String },

    /// Client-authoritative snapshot of the sender's own record
    StateUpdate { player: PlayerUpdate },

    /// The sender hit `target` (hit test done client-side)
    ShootIntent {
        /// Sender's own snapshot at the time of the shot
        shooter: PlayerUpdate,
        target: ShotTarget,
    },

    /// Leave the room; the connection stays open but is done
    VoluntaryLeave,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Target snapshot of a shoot intent. Only the id is trusted; the rest of the
/// record the client echoes back is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotTarget {
    pub id: ConnectionId,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: ConnectionId,
        server_time: u64,
    },

    /// Recipient's own current record
    SelfState { player: PlayerRecord },

    /// Everyone else in the recipient's room. Order is unspecified.
    RoomRoster { players: Vec<PlayerRecord> },

    /// A claim was refused; the connection may retry with another identity
    IdentityRejected {
        name: String,
        room: String,
        reason: String,
    },

    /// Recipient's health dropped to zero; its record is gone
    Eliminated,

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_claim_identity() {
        let msg: ClientMsg =
            serde_json::from_value(json!({"type": "claim_identity", "name": "Alice", "room": "r1"}))
                .unwrap();
        assert!(matches!(msg, ClientMsg::ClaimIdentity { ref name, ref room } if name == "Alice" && room == "r1"));
    }

    #[test]
    fn state_update_accepts_full_record_shape() {
        let raw = json!({
            "type": "state_update",
            "player": {
                "id": "6f1f4a9e-7a4f-4c58-9d0e-55a2b8f1f0aa",
                "name": "Alice",
                "room": "r1",
                "x": 1.0, "y": 2.5, "z": -3.0,
                "health": 80,
                "damage": 2,
                "color": "orange"
            }
        });

        let msg: ClientMsg = serde_json::from_value(raw).unwrap();
        match msg {
            ClientMsg::StateUpdate { player } => {
                assert_eq!(player.y, 2.5);
                assert_eq!(player.health, 80);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shoot_intent_only_needs_target_id() {
        let raw = json!({
            "type": "shoot_intent",
            "shooter": {
                "name": "Alice", "x": 0.0, "y": 0.0, "z": 0.0,
                "health": 100, "damage": 1, "color": "red"
            },
            "target": {"id": "6f1f4a9e-7a4f-4c58-9d0e-55a2b8f1f0aa", "name": "Bob", "health": 12}
        });

        assert!(matches!(
            serde_json::from_value::<ClientMsg>(raw).unwrap(),
            ClientMsg::ShootIntent { .. }
        ));
    }

    #[test]
    fn unit_variants_are_bare_tags() {
        let leave: ClientMsg = serde_json::from_str(r#"{"type":"voluntary_leave"}"#).unwrap();
        assert!(matches!(leave, ClientMsg::VoluntaryLeave));

        assert_eq!(
            serde_json::to_value(ServerMsg::Eliminated).unwrap(),
            json!({"type": "eliminated"})
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }
}
