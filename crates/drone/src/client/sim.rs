//! Sim — point-mass vehicle model for simulation and tests.
//!
//! Each vehicle flies straight at its commanded target with a fixed speed
//! and stops on it. Telemetry is exact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::vehicle::{Dynamics, MotionSink, PositionFeed};
use crate::geo::Vec3;
use crate::nbt::DroneId;
use crate::state::MotionCommand;

#[derive(Debug, Clone)]
struct SimVehicle {
    position: Vec3,
    target: Option<Vec3>,
    look_ahead: Option<usize>,
    commands: usize,
    active: bool,
}

#[derive(Default)]
struct Inner {
    vehicles: HashMap<DroneId, SimVehicle>,
    elapsed: Duration,
}

/// Cheaply cloneable handle; clones share the same fleet.
#[derive(Clone)]
pub struct SimulatedFleet {
    /// Metres per second.
    speed: f64,
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedFleet {
    pub fn new(speed: f64) -> Self {
        Self { speed, inner: Arc::new(Mutex::new(Inner::default())) }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Simulated time advanced so far.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().elapsed
    }

    pub fn target(&self, id: DroneId) -> Option<Vec3> {
        self.inner.lock().vehicles.get(&id).and_then(|v| v.target)
    }

    /// Last published look-ahead index.
    pub fn published_look_ahead(&self, id: DroneId) -> Option<usize> {
        self.inner.lock().vehicles.get(&id).and_then(|v| v.look_ahead)
    }

    /// Number of motion commands received.
    pub fn command_count(&self, id: DroneId) -> usize {
        self.inner.lock().vehicles.get(&id).map_or(0, |v| v.commands)
    }

    pub fn is_active(&self, id: DroneId) -> bool {
        self.inner.lock().vehicles.get(&id).is_some_and(|v| v.active)
    }

    /// Teleport a vehicle; tests use this to force arrivals.
    pub fn place(&self, id: DroneId, position: Vec3) {
        if let Some(v) = self.inner.lock().vehicles.get_mut(&id) {
            v.position = position;
        }
    }
}

impl PositionFeed for SimulatedFleet {
    fn latest_position(&self, id: DroneId) -> Option<Vec3> {
        self.inner.lock().vehicles.get(&id).map(|v| v.position)
    }
}

impl MotionSink for SimulatedFleet {
    fn spawn(&self, id: DroneId, position: Vec3) {
        debug!(drone = %id, %position, "spawned");
        self.inner.lock().vehicles.insert(
            id,
            SimVehicle { position, target: None, look_ahead: None, commands: 0, active: true },
        );
    }

    fn command(&self, id: DroneId, command: MotionCommand) {
        let mut inner = self.inner.lock();
        match inner.vehicles.get_mut(&id) {
            Some(v) if v.active => {
                v.target = Some(command.target);
                v.commands += 1;
            }
            _ => trace!(drone = %id, "command for inactive vehicle ignored"),
        }
    }

    fn publish_look_ahead(&self, id: DroneId, look_ahead: usize) {
        if let Some(v) = self.inner.lock().vehicles.get_mut(&id) {
            v.look_ahead = Some(look_ahead);
        }
    }

    fn shutdown(&self, id: DroneId) {
        if let Some(v) = self.inner.lock().vehicles.get_mut(&id) {
            v.active = false;
            v.target = None;
        }
    }
}

impl Dynamics for SimulatedFleet {
    fn advance(&self, dt: Duration) {
        let step = self.speed * dt.as_secs_f64();
        let mut inner = self.inner.lock();
        inner.elapsed += dt;
        for v in inner.vehicles.values_mut().filter(|v| v.active) {
            if let Some(target) = v.target {
                v.position = v.position.step_towards(&target, step);
            }
        }
    }
}
