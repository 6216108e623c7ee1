//! Neighbour table — static chain topology as index lookups.

use std::fmt;
use serde::{Deserialize, Serialize};

/// Index of a vehicle in the swarm (0 is the leader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DroneId(pub usize);

impl DroneId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uav{}", self.0)
    }
}

/// Which neighbour a message came from or goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Towards the leader.
    Predecessor,
    /// Towards the tail.
    Successor,
}

/// One-hop neighbours of a node in the line formation.
///
/// Built once when the chain is laid out and never mutated afterwards:
/// only waypoint targets change during a mission, not the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborTable {
    pub id: DroneId,
    pub predecessor: Option<DroneId>,
    pub successor: Option<DroneId>,
}

impl NeighborTable {
    /// Table for node `id` in a line of `n` nodes: `id - 1` and `id + 1`
    /// when they exist.
    pub fn initial(id: usize, n: usize) -> Self {
        Self {
            id: DroneId(id),
            predecessor: id.checked_sub(1).map(DroneId),
            successor: if id + 1 < n { Some(DroneId(id + 1)) } else { None },
        }
    }

    /// How `other` relates to this node, if it is a neighbour at all.
    pub fn relation_of(&self, other: DroneId) -> Option<Relation> {
        if self.predecessor == Some(other) {
            Some(Relation::Predecessor)
        } else if self.successor == Some(other) {
            Some(Relation::Successor)
        } else {
            None
        }
    }

    pub fn neighbor(&self, relation: Relation) -> Option<DroneId> {
        match relation {
            Relation::Predecessor => self.predecessor,
            Relation::Successor => self.successor,
        }
    }
}
