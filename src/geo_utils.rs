//! # Geographic Utilities
//!
//! Core geographic computation utilities for route tracking.
//!
//! Two families of distance are used throughout the crate and they are deliberately kept
//! apart:
//!
//! | Function | Model | Used for |
//! |----------|-------|----------|
//! | [`haversine_distance`] | Sphere | Route lengths, remaining distance |
//! | [`LocalProjection`] | Plane (equirectangular) | Map matching a fix to a segment |
//! | [`project_onto_segment`] | Plane | Perpendicular foot and parameter `t` |
//! | [`offset_by_meters`] | Plane | Moving a coordinate by a metric offset |
//!
//! ## Example
//!
//! ```rust
//! use route_tracker::{Coordinate, geo_utils};
//!
//! let a = Coordinate::new(45.0000, 6.0000);
//! let b = Coordinate::new(45.0010, 6.0000);
//!
//! // ~111m north
//! let length = geo_utils::haversine_distance(&a, &b);
//! assert!((length - 111.2).abs() < 0.5);
//!
//! // A point 5m east of the segment midpoint
//! let mid = Coordinate::new(45.0005, 6.0000);
//! let p = geo_utils::offset_by_meters(&mid, 5.0, 0.0);
//! let proj = geo_utils::project_onto_segment(&p, &a, &b);
//! assert!((proj.distance - 5.0).abs() < 0.05);
//! assert!((proj.t - 0.5).abs() < 0.01);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two points on a sphere.
//! It's the standard method for GPS distance calculation, accurate to within 0.3% for most
//! practical applications.
//!
//! ### Local Projection
//!
//! Matching uses an equirectangular projection anchored at a segment's start vertex:
//! `x = Δλ·R·cos(φ₀)`, `y = Δφ·R`. It is valid at city scale, where route segments are at
//! most a few hundred meters long, and keeps the per-segment cost to a handful of
//! multiplications.

use geo::{Distance, Haversine, Point};

use crate::Coordinate;

/// Mean Earth radius in meters, matching the radius `geo` uses for haversine.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use route_tracker::{Coordinate, geo_utils};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

// =============================================================================
// Planar Projection
// =============================================================================

/// Equirectangular projection anchored at an origin coordinate.
///
/// Coordinates are mapped to meters east (`x`) and north (`y`) of the origin.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin: Coordinate,
    meters_per_deg_lng: f64,
    meters_per_deg_lat: f64,
}

impl LocalProjection {
    /// Create a projection anchored at `origin`.
    pub fn new(origin: Coordinate) -> Self {
        let meters_per_deg_lat = EARTH_RADIUS_M.to_radians();
        Self {
            origin,
            meters_per_deg_lng: meters_per_deg_lat * origin.latitude.to_radians().cos(),
            meters_per_deg_lat,
        }
    }

    /// Project a coordinate to `(x, y)` meters relative to the origin.
    #[inline]
    pub fn project(&self, p: &Coordinate) -> (f64, f64) {
        (
            (p.longitude - self.origin.longitude) * self.meters_per_deg_lng,
            (p.latitude - self.origin.latitude) * self.meters_per_deg_lat,
        )
    }

    /// Inverse of [`LocalProjection::project`].
    ///
    /// At the poles the east component cannot be represented and is dropped.
    pub fn unproject(&self, x: f64, y: f64) -> Coordinate {
        let longitude = if self.meters_per_deg_lng.abs() > f64::EPSILON {
            self.origin.longitude + x / self.meters_per_deg_lng
        } else {
            self.origin.longitude
        };
        Coordinate::new(self.origin.latitude + y / self.meters_per_deg_lat, longitude)
    }
}

/// Perpendicular projection of a point onto one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Planar distance from the point to its foot on the segment, in meters
    pub distance: f64,
    /// Position of the foot along the segment, clamped to [0, 1]
    pub t: f64,
}

/// Project `p` onto the segment `a -> b` in a plane anchored at `a`.
///
/// Zero-length segments project to `a` with `t = 0`.
pub fn project_onto_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> SegmentProjection {
    let projection = LocalProjection::new(*a);
    let (px, py) = projection.project(p);
    let (bx, by) = projection.project(b);

    // a is the origin, so the segment vector is simply b
    let vv = bx * bx + by * by;
    let t = if vv > 0.0 {
        ((px * bx + py * by) / vv).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let dx = px - t * bx;
    let dy = py - t * by;

    SegmentProjection {
        distance: (dx * dx + dy * dy).sqrt(),
        t,
    }
}

/// Move a coordinate by `east_m` / `north_m` meters using the local projection.
pub fn offset_by_meters(p: &Coordinate, east_m: f64, north_m: f64) -> Coordinate {
    LocalProjection::new(*p).unproject(east_m, north_m)
}

// =============================================================================
// Unit Tests
// =============================================================================
