//! Message — wire contract between adjacent vehicles.
//!
//! Two directions travel the chain:
//! - [`Announce`] flows downstream (towards the tail) and tells the receiver
//!   which target to track next.
//! - [`StatusAck`] flows upstream (towards the leader) and reports the
//!   sender's progress, plus the Centre's hold request.
//!
//! Payloads are JSON-encoded into [`Bytes`] for the message channel.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Vec3;
use crate::nbt::{DroneId, NeighborTable};
use crate::path::WaypointPath;
use crate::state::role::Role;

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Empty payload")]
    Empty,
}

/// Downstream state announcement (predecessor → successor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announce {
    pub sender: DroneId,
    pub role: Role,
    /// The sender's own cursor.
    pub look_ahead_index: usize,
    /// Path index of `target` in the receiver's derived path.
    pub target_index: usize,
    /// Where the receiver should go next.
    pub target: Vec3,
    /// The sender has finished; `target` is the receiver's last one.
    pub complete: bool,
    pub neighbors: NeighborTable,
}

/// Upstream status report (successor → predecessor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAck {
    pub sender: DroneId,
    pub role: Role,
    pub look_ahead_index: usize,
    /// Highest path index the sender has physically reached.
    pub reached_index: Option<usize>,
    pub complete: bool,
    /// Tail side lags too far behind; upstream must not advance.
    pub hold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Announce(Announce),
    StatusAck(StatusAck),
}

impl Message {
    pub fn sender(&self) -> DroneId {
        match self {
            Message::Announce(a) => a.sender,
            Message::StatusAck(s) => s.sender,
        }
    }

    pub fn encode(&self) -> Result<Bytes, MessageError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn decode(payload: &[u8]) -> Result<Self, MessageError> {
        if payload.is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(serde_json::from_slice(payload)?)
    }
}

impl Announce {
    /// Announcement derived from the sender's path: the element one behind
    /// its cursor. `None` while the path is still empty.
    pub fn from_path(nbt: NeighborTable, role: Role, path: &WaypointPath, complete: bool) -> Option<Self> {
        let (target_index, target) = path.trailing()?;
        Some(Self {
            sender: nbt.id,
            role,
            look_ahead_index: path.look_ahead(),
            target_index,
            target,
            complete,
            neighbors: nbt,
        })
    }

    /// Startup announcement, before any progress has been made.
    pub fn initial(nbt: NeighborTable, role: Role, path: &WaypointPath) -> Option<Self> {
        Self::from_path(nbt, role, path, false)
    }
}

impl From<Announce> for Message {
    fn from(a: Announce) -> Self {
        Message::Announce(a)
    }
}

impl From<StatusAck> for Message {
    fn from(s: StatusAck) -> Self {
        Message::StatusAck(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::role::Side;

    fn announce() -> Announce {
        Announce {
            sender: DroneId(0),
            role: Role::Leader,
            look_ahead_index: 3,
            target_index: 2,
            target: Vec3::new(1.0, 2.0, 3.0),
            complete: false,
            neighbors: NeighborTable::initial(0, 3),
        }
    }

    #[test]
    fn test_announce_wire_format_is_tagged() {
        let bytes = Message::from(announce()).encode().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["kind"], "announce");
        assert_eq!(v["role"], "leader");
        assert_eq!(v["target_index"], 2);
        assert_eq!(v["neighbors"]["successor"], 1);
    }

    #[test]
    fn test_decode_status_ack() {
        let raw = r#"{"kind":"status_ack","sender":2,"role":{"interior":"centre"},
            "look_ahead_index":4,"reached_index":3,"complete":false,"hold":true}"#;
        let msg = Message::decode(raw.as_bytes()).unwrap();
        match msg {
            Message::StatusAck(s) => {
                assert_eq!(s.sender, DroneId(2));
                assert_eq!(s.role, Role::Interior(Side::Centre));
                assert_eq!(s.reached_index, Some(3));
                assert!(s.hold);
            }
            other => panic!("expected status ack, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(Message::decode(b"\x00\x01not json"), Err(MessageError::Malformed(_))));
        assert!(matches!(Message::decode(b""), Err(MessageError::Empty)));
        assert!(Message::decode(br#"{"kind":"teleport","sender":1}"#).is_err());
    }

    #[test]
    fn test_initial_needs_a_path_element() {
        let nbt = NeighborTable::initial(0, 3);
        assert!(Announce::initial(nbt, Role::Leader, &WaypointPath::default()).is_none());

        let path = WaypointPath::new(vec![Vec3::new(4.0, 0.0, 0.0), Vec3::ZERO]);
        let a = Announce::initial(nbt, Role::Leader, &path).unwrap();
        assert_eq!(a.target_index, 0);
        assert_eq!(a.target, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(a.look_ahead_index, 0);
        assert!(!a.complete);
    }

    #[test]
    fn test_sender() {
        assert_eq!(Message::from(announce()).sender(), DroneId(0));
    }
}
