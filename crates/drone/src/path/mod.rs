//! Path module — waypoint sequences and the lawn-mower scan generator.

pub mod scan;

pub use scan::{ScanPattern, ScanSchedule};

use serde::Serialize;

use crate::geo::Vec3;

/// Ordered targets plus the cursor pointing at the next unvisited one.
///
/// # Invariants
///
/// - `look_ahead` never decreases.
/// - Elements are only ever appended; the path never shrinks.
/// - When the path is non-empty, `look_ahead < len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaypointPath {
    points: Vec<Vec3>,
    look_ahead: usize,
}

impl WaypointPath {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points, look_ahead: 0 }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn look_ahead(&self) -> usize {
        self.look_ahead
    }

    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    /// The element the cursor points at.
    pub fn current(&self) -> Option<Vec3> {
        self.get(self.look_ahead)
    }

    /// True when the cursor sits on the final element.
    pub fn at_last(&self) -> bool {
        !self.points.is_empty() && self.look_ahead + 1 >= self.points.len()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Move the cursor to the next element. Returns `false` (and leaves the
    /// cursor alone) when there is none yet.
    pub fn advance(&mut self) -> bool {
        if self.look_ahead + 1 < self.points.len() {
            self.look_ahead += 1;
            true
        } else {
            false
        }
    }

    /// Append a fresh batch of targets (leader scan repeats).
    pub fn extend<I: IntoIterator<Item = Vec3>>(&mut self, points: I) {
        self.points.extend(points);
    }

    /// Grow the path so that `index` exists, using `target` for every
    /// missing slot. Slots already present are never overwritten.
    ///
    /// Returns the number of elements appended.
    pub fn fill_to(&mut self, index: usize, target: Vec3) -> usize {
        let before = self.points.len();
        while self.points.len() <= index {
            self.points.push(target);
        }
        self.points.len() - before
    }

    /// The element handed to the next hop downstream: one behind the
    /// cursor, clamped to the start of the path.
    pub fn trailing(&self) -> Option<(usize, Vec3)> {
        let index = self.look_ahead.saturating_sub(1);
        self.get(index).map(|p| (index, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| Vec3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_advance_stops_at_last() {
        let mut p = WaypointPath::new(pts(3));
        assert!(p.advance());
        assert!(p.advance());
        assert!(!p.advance());
        assert_eq!(p.look_ahead(), 2);
        assert!(p.at_last());
    }

    #[test]
    fn test_empty_path() {
        let mut p = WaypointPath::default();
        assert!(p.current().is_none());
        assert!(!p.advance());
        assert!(!p.at_last());
        assert!(p.trailing().is_none());
    }

    #[test]
    fn test_trailing_clamps_to_start() {
        let mut p = WaypointPath::new(pts(3));
        assert_eq!(p.trailing(), Some((0, Vec3::new(0.0, 0.0, 0.0))));
        p.advance();
        assert_eq!(p.trailing(), Some((0, Vec3::new(0.0, 0.0, 0.0))));
        p.advance();
        assert_eq!(p.trailing(), Some((1, Vec3::new(1.0, 0.0, 0.0))));
    }

    #[test]
    fn test_fill_to_fills_forward_and_never_overwrites() {
        let mut p = WaypointPath::default();
        assert_eq!(p.fill_to(0, Vec3::new(1.0, 0.0, 0.0)), 1);
        assert_eq!(p.fill_to(3, Vec3::new(5.0, 0.0, 0.0)), 3);
        assert_eq!(p.len(), 4);
        assert_eq!(p.get(0), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(p.get(1), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(p.fill_to(2, Vec3::new(9.0, 0.0, 0.0)), 0);
        assert_eq!(p.get(2), Some(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_extend_keeps_cursor() {
        let mut p = WaypointPath::new(pts(2));
        p.advance();
        p.extend(pts(2));
        assert_eq!(p.look_ahead(), 1);
        assert_eq!(p.len(), 4);
        assert!(p.advance());
    }
}
