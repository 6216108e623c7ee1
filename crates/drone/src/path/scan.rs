//! Scan — boustrophedon ("lawn-mower") pattern over the disaster site.
//!
//! Legs run parallel to the x axis and are centred on the origin. Each leg
//! is `leg_length` long; consecutive legs sit `strip_spacing` apart along y
//! and alternate direction. The pattern is generated lazily and can be
//! restarted any number of times with identical output.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::geo::Vec3;

/// Parameters of a single lawn-mower pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanPattern {
    /// Centre of the scanned region; its z is the scan altitude.
    pub origin: Vec3,
    pub strip_spacing: f64,
    pub leg_length: f64,
    /// Number of legs in one pass.
    pub strips: usize,
}

impl ScanPattern {
    /// A fresh iterator over one pass of the pattern.
    pub fn iter(&self) -> LawnMower {
        LawnMower { pattern: *self, next: 0 }
    }

    /// Number of waypoints in one pass (two per leg).
    pub fn waypoint_count(&self) -> usize {
        self.strips * 2
    }
}

impl IntoIterator for ScanPattern {
    type Item = Vec3;
    type IntoIter = LawnMower;

    fn into_iter(self) -> LawnMower {
        self.iter()
    }
}

/// Lazy, finite iterator over the waypoints of one pass.
#[derive(Debug, Clone)]
pub struct LawnMower {
    pattern: ScanPattern,
    next: usize,
}

impl LawnMower {
    /// Rewind to the first waypoint of the pass.
    pub fn restart(&mut self) {
        self.next = 0;
    }

    fn waypoint(&self, index: usize) -> Vec3 {
        let p = &self.pattern;
        let leg = index / 2;
        let at_end_of_leg = index % 2 == 1;
        let half = p.leg_length / 2.0;
        let y0 = p.origin.y - (p.strips.saturating_sub(1) as f64) * p.strip_spacing / 2.0;
        let forward = leg % 2 == 0;
        // forward legs run -x → +x, reversed legs +x → -x
        let x = match (forward, at_end_of_leg) {
            (true, false) | (false, true) => p.origin.x - half,
            (true, true) | (false, false) => p.origin.x + half,
        };
        Vec3::new(x, y0 + leg as f64 * p.strip_spacing, p.origin.z)
    }
}

impl Iterator for LawnMower {
    type Item = Vec3;

    fn next(&mut self) -> Option<Vec3> {
        if self.next >= self.pattern.waypoint_count() {
            return None;
        }
        let wp = self.waypoint(self.next);
        self.next += 1;
        Some(wp)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.pattern.waypoint_count().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for LawnMower {}

/// A pattern plus how often it is flown again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSchedule {
    pub pattern: ScanPattern,
    /// Restart the pass this long after the previous one began.
    /// `None` flies a single pass.
    pub repeat: Option<Duration>,
}

impl ScanSchedule {
    /// Whether a new pass is due, given when the current one started.
    pub fn repeat_due(&self, pass_started: Duration, now: Duration) -> bool {
        match self.repeat {
            Some(interval) => now.saturating_sub(pass_started) >= interval,
            None => false,
        }
    }
}
