//! Progress along the selected route.
//!
//! Remaining distance is measured on the sphere (haversine segment lengths), independently
//! of the planar projection used for matching.

use crate::matcher::MatchResult;
use crate::{RouteGeometry, RouteStep};

/// Progress derived from one match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Meters left to the end of the route
    pub remaining_distance: f64,
    /// Meters covered since the start (total - remaining, never negative)
    pub traveled_distance: f64,
    /// Index of the next maneuver, `None` for a route without steps
    pub step_index: Option<usize>,
    /// Meters until that maneuver
    pub distance_to_next_maneuver: f64,
}

/// Position of the rider relative to the step list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverPosition {
    pub step_index: Option<usize>,
    pub distance_to_maneuver: f64,
}

/// Remaining distance from `(segment_index, t)` to the end of the route.
///
/// The segment index and `t` are clamped to their valid ranges. Returns infinity for a
/// geometry without segments.
pub fn remaining_distance(geometry: &RouteGeometry, segment_index: usize, t: f64) -> f64 {
    let segment_count = geometry.segment_count();
    if segment_count == 0 {
        return f64::INFINITY;
    }

    let si = segment_index.min(segment_count - 1);
    let t = t.clamp(0.0, 1.0);

    (1.0 - t) * geometry.segment_length(si) + geometry.length_after(si)
}

/// Find the first step whose cumulative distance reaches `traveled`.
///
/// Past the end of the step list the last step is reported with zero distance left.
pub fn locate_maneuver(steps: &[RouteStep], traveled: f64) -> ManeuverPosition {
    let mut cumulative = 0.0;
    for (i, step) in steps.iter().enumerate() {
        cumulative += step.distance_meters;
        if cumulative >= traveled {
            return ManeuverPosition {
                step_index: Some(i),
                distance_to_maneuver: (cumulative - traveled).max(0.0),
            };
        }
    }

    ManeuverPosition {
        step_index: steps.len().checked_sub(1),
        distance_to_maneuver: 0.0,
    }
}

/// Turns successive matches into progress, carrying the last match forward as the next
/// fix's search hint.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last_match: Option<MatchResult>,
    hint: Option<usize>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segment to center the next match on.
    pub fn hint(&self) -> Option<usize> {
        self.hint
    }

    pub fn last_match(&self) -> Option<&MatchResult> {
        self.last_match.as_ref()
    }

    /// Record a match and compute progress.
    ///
    /// `keep_as_hint` is false for low-accuracy fixes so that a noisy match cannot drag the
    /// search window away from the rider.
    pub fn update(
        &mut self,
        geometry: &RouteGeometry,
        steps: &[RouteStep],
        total_distance: f64,
        matched: MatchResult,
        keep_as_hint: bool,
    ) -> Progress {
        self.last_match = Some(matched);
        if keep_as_hint {
            self.hint = Some(matched.segment_index);
        }

        let remaining = remaining_distance(geometry, matched.segment_index, matched.t);
        let traveled = (total_distance - remaining).max(0.0);
        let maneuver = locate_maneuver(steps, traveled);

        Progress {
            remaining_distance: remaining,
            traveled_distance: traveled,
            step_index: maneuver.step_index,
            distance_to_next_maneuver: maneuver.distance_to_maneuver,
        }
    }

    pub fn reset(&mut self) {
        self.last_match = None;
        self.hint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn north_route() -> RouteGeometry {
        // Three segments of ~111m each
        RouteGeometry::new((0..4).map(|i| Coordinate::new(i as f64 * 0.001, 0.0)).collect())
    }

    fn steps() -> Vec<RouteStep> {
        vec![
            RouteStep::new("Head north", 150.0, 30.0),
            RouteStep::new("Keep straight", 100.0, 20.0),
            RouteStep::new("Arrive", 83.6, 16.0),
        ]
    }

    #[test]
    fn test_remaining_distance_mid_route() {
        let geometry = north_route();
        let seg = geometry.segment_length(0);

        let at_start = remaining_distance(&geometry, 0, 0.0);
        assert!((at_start - geometry.total_length()).abs() < 1e-9);

        let mid_second = remaining_distance(&geometry, 1, 0.5);
        assert!((mid_second - 1.5 * seg).abs() < 0.01);

        let at_end = remaining_distance(&geometry, 2, 1.0);
        assert!(at_end.abs() < 1e-9);
    }

    #[test]
    fn test_remaining_distance_clamps_inputs() {
        let geometry = north_route();
        assert_eq!(remaining_distance(&geometry, 99, 0.0), remaining_distance(&geometry, 2, 0.0));
        assert_eq!(remaining_distance(&geometry, 0, -3.0), remaining_distance(&geometry, 0, 0.0));
        assert_eq!(remaining_distance(&geometry, 0, 7.0), remaining_distance(&geometry, 0, 1.0));
    }

    #[test]
    fn test_remaining_distance_degenerate() {
        let geometry = RouteGeometry::new(vec![Coordinate::new(0.0, 0.0)]);
        assert_eq!(remaining_distance(&geometry, 0, 0.5), f64::INFINITY);
    }

    #[test]
    fn test_locate_maneuver() {
        let steps = steps();

        let start = locate_maneuver(&steps, 0.0);
        assert_eq!(start.step_index, Some(0));
        assert!((start.distance_to_maneuver - 150.0).abs() < 1e-9);

        let second = locate_maneuver(&steps, 180.0);
        assert_eq!(second.step_index, Some(1));
        assert!((second.distance_to_maneuver - 70.0).abs() < 1e-9);

        // Exactly on a boundary stays on the step that ends there
        let boundary = locate_maneuver(&steps, 250.0);
        assert_eq!(boundary.step_index, Some(1));
        assert_eq!(boundary.distance_to_maneuver, 0.0);
    }

    #[test]
    fn test_locate_maneuver_past_end_and_empty() {
        let past = locate_maneuver(&steps(), 10_000.0);
        assert_eq!(past.step_index, Some(2));
        assert_eq!(past.distance_to_maneuver, 0.0);

        let none = locate_maneuver(&[], 50.0);
        assert_eq!(none.step_index, None);
        assert_eq!(none.distance_to_maneuver, 0.0);
    }

    #[test]
    fn test_tracker_update_and_hint() {
        let geometry = north_route();
        let total = geometry.total_length();
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.hint(), None);

        let matched = MatchResult { segment_index: 1, t: 0.5, distance_meters: 3.0 };
        let progress = tracker.update(&geometry, &steps(), total, matched, true);

        assert_eq!(tracker.hint(), Some(1));
        assert_eq!(tracker.last_match(), Some(&matched));
        assert!((progress.traveled_distance + progress.remaining_distance - total).abs() < 1e-9);
        assert_eq!(progress.step_index, Some(1));

        // Low-accuracy match: progress still computed, hint untouched
        let noisy = MatchResult { segment_index: 2, t: 0.9, distance_meters: 50.0 };
        tracker.update(&geometry, &steps(), total, noisy, false);
        assert_eq!(tracker.hint(), Some(1));
        assert_eq!(tracker.last_match(), Some(&noisy));

        tracker.reset();
        assert_eq!(tracker.hint(), None);
        assert_eq!(tracker.last_match(), None);
    }

    #[test]
    fn test_traveled_never_negative() {
        let geometry = north_route();
        let mut tracker = ProgressTracker::new();
        // Summary distance shorter than the geometry
        let matched = MatchResult { segment_index: 0, t: 0.0, distance_meters: 1.0 };
        let progress = tracker.update(&geometry, &steps(), 100.0, matched, true);
        assert_eq!(progress.traveled_distance, 0.0);
        assert_eq!(progress.step_index, Some(0));
    }
}
