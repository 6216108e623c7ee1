//! Phase — waypoint-progress state within a role.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Spawned, nothing commanded yet.
    #[default]
    Idle,
    /// Climbing to operational altitude.
    Ascending,
    /// Leader only: flying to the disaster site before scanning.
    Transit,
    /// Following the path.
    Tracking,
    /// Final element reached and nothing more will come.
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Ascending => "ascending",
            Phase::Transit => "transit",
            Phase::Tracking => "tracking",
            Phase::Complete => "complete",
        }
    }
}
