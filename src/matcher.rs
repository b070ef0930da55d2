//! # Map Matching
//!
//! Projects a raw position onto the nearest point of the selected route polyline.
//!
//! ## Algorithm
//! 1. For every candidate segment, project the fix into a plane anchored at the segment's
//!    start vertex and take the perpendicular foot, clamped to the segment (`t ∈ [0, 1]`)
//! 2. With a hint (the previous fix's segment), only scan `[hint - window, hint + window]`
//! 3. If that local best is not "good enough" and fallback is allowed, scan the whole route
//!    and keep the global best unless it is worse. This corrects large GPS jumps
//! 4. Without a hint, scan everything
//!
//! Under continuous motion the cost is O(window) per fix rather than O(route).
//!
//! Matching never fails: a geometry with fewer than two vertices yields
//! `distance_meters = f64::INFINITY`, which callers treat as "no usable match".

use crate::geo_utils::project_onto_segment;
use crate::{Coordinate, RouteGeometry};

/// Where a fix lands on the route.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MatchResult {
    /// Segment `[i -> i+1]`, always in `[0, vertex_count - 2]` for a real match
    pub segment_index: usize,
    /// Progress along that segment, in `[0, 1]`
    pub t: f64,
    /// Planar distance from the fix to the route, in meters
    pub distance_meters: f64,
}

impl MatchResult {
    /// The "no match" sentinel returned for degenerate geometry.
    pub fn no_match() -> Self {
        Self { segment_index: 0, t: 0.0, distance_meters: f64::INFINITY }
    }

    pub fn is_match(&self) -> bool {
        self.distance_meters.is_finite()
    }
}

/// Options for a single match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// Segment matched on the previous fix, if any
    pub hint_segment: Option<usize>,
    /// Segments scanned on each side of the hint
    pub search_window: usize,
    /// Allow a full scan when the windowed match is poor
    pub fallback_to_full_scan: bool,
    /// A windowed match closer than this is accepted without a full scan.
    /// Default: 12.0 meters
    pub good_match_distance_m: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            hint_segment: None,
            search_window: 0,
            fallback_to_full_scan: true,
            good_match_distance_m: 12.0,
        }
    }
}

/// Match a position onto a route geometry.
///
/// # Example
///
/// ```rust
/// use route_tracker::{geo_utils, match_position, Coordinate, MatchOptions, RouteGeometry};
///
/// // ~111m north from the equator
/// let geometry = RouteGeometry::new(vec![
///     Coordinate::new(0.0, 0.0),
///     Coordinate::new(0.001, 0.0),
/// ]);
///
/// // 5m east of the midpoint
/// let fix = geo_utils::offset_by_meters(&Coordinate::new(0.0005, 0.0), 5.0, 0.0);
///
/// let m = match_position(&fix, &geometry, &MatchOptions::default());
/// assert_eq!(m.segment_index, 0);
/// assert!((m.t - 0.5).abs() < 1e-6);
/// assert!((m.distance_meters - 5.0).abs() < 1e-6);
/// ```
pub fn match_position(
    position: &Coordinate,
    geometry: &RouteGeometry,
    options: &MatchOptions,
) -> MatchResult {
    let segment_count = geometry.segment_count();
    if segment_count == 0 {
        return MatchResult::no_match();
    }
    let last = segment_count - 1;

    let Some(hint) = options.hint_segment else {
        return scan_segments(position, geometry, 0, last);
    };

    let from = hint.saturating_sub(options.search_window).min(last);
    let to = hint.saturating_add(options.search_window).min(last);
    let local = scan_segments(position, geometry, from, to);

    if !options.fallback_to_full_scan || local.distance_meters < options.good_match_distance_m {
        return local;
    }

    let full = scan_segments(position, geometry, 0, last);
    if full.distance_meters <= local.distance_meters {
        full
    } else {
        local
    }
}

/// Best match over segments `from..=to`; ties keep the lowest index.
fn scan_segments(position: &Coordinate, geometry: &RouteGeometry, from: usize, to: usize) -> MatchResult {
    let mut best = MatchResult::no_match();

    for i in from..=to {
        let Some((a, b)) = geometry.segment(i) else {
            break;
        };
        let proj = project_onto_segment(position, a, b);
        if proj.distance < best.distance_meters {
            best = MatchResult { segment_index: i, t: proj.t, distance_meters: proj.distance };
        }
    }

    best
}
