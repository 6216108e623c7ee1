//! Model — DroneConfig and related enums.

use serde::{Deserialize, Serialize};

/// Which side of a Centre node decides whether it may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentrePriority {
    /// Tail side wins: a lagging tail holds the Centre and, through the
    /// Left nodes, the leader.
    Tail,
    /// Leader side wins: tail lag is reported but never blocks progress.
    Leader,
}

impl std::str::FromStr for CentrePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tail" => Ok(CentrePriority::Tail),
            "leader" => Ok(CentrePriority::Leader),
            other => Err(format!("unknown centre priority: {}", other)),
        }
    }
}

/// Per-vehicle protocol tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    /// Arrival radius in metres.
    pub arrival_threshold: f64,
    /// Operational altitude reached before tracking starts.
    pub takeoff_altitude: f64,
    pub centre_priority: CentrePriority,
    /// Path indices the tail side may trail the Centre by before a hold.
    pub centre_slack: usize,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            arrival_threshold: 1.0,
            takeoff_altitude: 10.0,
            centre_priority: CentrePriority::Tail,
            centre_slack: 1,
        }
    }
}

impl DroneConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.arrival_threshold > 0.0) || !self.arrival_threshold.is_finite() {
            return Err("arrival_threshold must be a positive number".to_string());
        }
        if !self.takeoff_altitude.is_finite() || self.takeoff_altitude < 0.0 {
            return Err("takeoff_altitude must be >= 0".to_string());
        }
        Ok(())
    }
}
