//! Vehicle — telemetry and flight-control seams.
//!
//! The coordinator reads positions through [`PositionFeed`], issues targets
//! through [`MotionSink`] and, in simulation, moves time forward through
//! [`Dynamics`]. A real deployment backs these with a flight stack.

use std::time::Duration;

use crate::geo::Vec3;
use crate::nbt::DroneId;
use crate::state::MotionCommand;

pub trait PositionFeed: Send + Sync {
    /// Most recent position fix, `None` before the first one.
    fn latest_position(&self, id: DroneId) -> Option<Vec3>;
}

pub trait MotionSink: Send + Sync {
    /// Place a vehicle at its spawn point.
    fn spawn(&self, id: DroneId, position: Vec3);

    /// Fly towards a new target.
    fn command(&self, id: DroneId, command: MotionCommand);

    /// Publish the look-ahead index for external observers.
    fn publish_look_ahead(&self, id: DroneId, look_ahead: usize);

    /// Stop accepting commands for this vehicle.
    fn shutdown(&self, id: DroneId);
}

pub trait Dynamics: Send + Sync {
    /// Move every vehicle forward by `dt`.
    fn advance(&self, dt: Duration);
}
