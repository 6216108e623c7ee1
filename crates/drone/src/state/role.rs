//! Role — chain role of a vehicle, fixed for the whole mission.

use serde::{Deserialize, Serialize};

/// Position of an interior vehicle relative to the branch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Between the leader and the Centre.
    Left,
    /// Between the Centre and the tail.
    Right,
    /// The branch point itself; relays in both directions.
    Centre,
}

/// The role a vehicle plays in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Head of the chain; owns the generated scan path.
    Leader,
    /// Any node strictly between the leader and the tail.
    Interior(Side),
    /// Tail of the chain, nearest the base.
    End,
}

impl Role {
    /// Role of node `id` in a line of `n` nodes with an optional Centre.
    ///
    /// Node 0 always leads and node `n - 1` is the tail (unless it is also
    /// the leader). Interior nodes before the Centre are `Left`, after it
    /// `Right`. Without a Centre every interior node is `Left`.
    pub fn assign(id: usize, n: usize, centre: Option<usize>) -> Self {
        if id == 0 {
            return Role::Leader;
        }
        if id + 1 >= n {
            return Role::End;
        }
        match centre {
            Some(c) if id == c => Role::Interior(Side::Centre),
            Some(c) if id > c => Role::Interior(Side::Right),
            _ => Role::Interior(Side::Left),
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader)
    }

    pub fn is_centre(&self) -> bool {
        matches!(self, Role::Interior(Side::Centre))
    }

    /// Whether this role forwards announcements downstream.
    pub fn forwards_downstream(&self) -> bool {
        !matches!(self, Role::End)
    }

    /// String representation for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Leader => "leader",
            Role::Interior(Side::Left) => "left",
            Role::Interior(Side::Right) => "right",
            Role::Interior(Side::Centre) => "centre",
            Role::End => "end",
        }
    }
}
