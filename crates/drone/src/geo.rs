//! Geo — 3-D positions and the arrival threshold test.

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Deserialize, Serialize};

/// A point (or offset) in the local mission frame, metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Vec3) -> f64 {
        (*self - *other).norm()
    }

    /// Same horizontal position, different altitude.
    pub fn with_z(&self, z: f64) -> Self {
        Self { z, ..*self }
    }

    /// Move towards `target` by at most `step`, landing exactly on it
    /// when it is closer than that.
    pub fn step_towards(&self, target: &Vec3, step: f64) -> Vec3 {
        let delta = *target - *self;
        let dist = delta.norm();
        if dist <= step || dist == 0.0 {
            return *target;
        }
        let k = step / dist;
        Vec3::new(self.x + delta.x * k, self.y + delta.y * k, self.z + delta.z * k)
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// True iff `position` lies within `epsilon` metres of `target` (inclusive).
pub fn within_threshold(position: &Vec3, target: &Vec3, epsilon: f64) -> bool {
    position.distance(target) <= epsilon
}
