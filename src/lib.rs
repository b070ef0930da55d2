//! # Route Tracker
//!
//! Real-time GPS route tracking for cycling navigation.
//!
//! This library turns a stream of noisy GPS fixes into a stable answer to
//! "where am I on this route, how far is left, am I off-route, and should we recompute":
//! - Map matching of each fix onto the selected route polyline
//! - Remaining distance, ETA and next maneuver
//! - Off-route detection with hysteresis and accuracy gating
//! - Reroute decisions with streak and cooldown gates, stale-result suppression
//! - Safety scoring of route candidates
//!
//! ## Features
//!
//! - **`http`** - Enable the directions HTTP client (route provider)
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_tracker::{
//!     score_candidates, Coordinate, NavigationSession, PositionFix, RouteDraft,
//!     RouteGeometry, RouteStep, RouteSummary, RoutingPreference, TrackingConfig,
//! };
//!
//! // A 1km route heading north
//! let geometry = RouteGeometry::new(
//!     (0..=10).map(|i| Coordinate::new(45.0 + i as f64 * 0.0009, 6.0)).collect(),
//! );
//! let steps = vec![RouteStep::new("Head north", geometry.total_length(), 240.0)];
//! let summary = RouteSummary::from_steps(geometry.total_length(), 240.0, &steps, &[]);
//! let draft = RouteDraft::new("route_0", geometry, steps, summary);
//!
//! let best = score_candidates(vec![draft], &RoutingPreference::default()).remove(0);
//!
//! let mut session = NavigationSession::new(TrackingConfig::default());
//! session.start(best, Some(Coordinate::new(45.009, 6.0)), RoutingPreference::default());
//!
//! let fix = PositionFix::new(45.0027, 6.0, 8.0, 1_000).with_speed(5.0);
//! let update = session.update(&fix).unwrap();
//!
//! assert!(!update.off_route);
//! assert!(update.remaining_distance > 600.0);
//! println!("{:.0}m left, {:.0}s", update.remaining_distance, update.eta.seconds);
//! ```

// Core tracking pipeline
pub mod geo_utils;
pub mod matcher;
pub mod progress;
pub mod off_route;
pub mod reroute;
pub mod eta;
pub mod scorer;

// Session state machine and its collaborators
pub mod cooldown;
pub mod feedback;
pub mod provider;
pub mod session;
pub mod navigator;
pub mod format;

// HTTP directions client
#[cfg(feature = "http")]
pub mod directions;

pub use cooldown::Cooldown;
pub use eta::{Eta, EtaEstimator, EtaSource};
pub use feedback::{FeedbackError, FeedbackEvent, FeedbackGate, FeedbackSink, NoFeedback};
pub use format::{format_distance, format_duration};
pub use matcher::{match_position, MatchOptions, MatchResult};
pub use navigator::Navigator;
pub use off_route::{OffRouteMonitor, OffRouteTransition};
pub use progress::{locate_maneuver, remaining_distance, ManeuverPosition, Progress, ProgressTracker};
pub use provider::{PositionError, PositionSource, RouteProvider, RouteRequest, RouteResult};
pub use reroute::RerouteController;
pub use scorer::{
    count_turn_like, high_speed_ratio, score_candidates, RouteCandidate, RouteDraft,
    RoutingPreference, ScoreBreakdown,
};
pub use session::{
    NavigationSession, NavigationUpdate, RerouteRequest, RouteApplyOutcome, SessionState,
    StopReason,
};

#[cfg(feature = "http")]
pub use directions::{DirectionsClient, DirectionsConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RouteTrackerRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by route calculation.
///
/// Map matching and fix processing never fail; they only ever report "no match".
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("route provider error: {0}")]
    Provider(String),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("no route found: {0}")]
    NoRoute(String),

    #[error("invalid route request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, NavError>;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use route_tracker::Coordinate;
/// let point = Coordinate::new(48.8566, 2.3522); // Paris
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A raw position fix as delivered by the platform location service.
///
/// Fixes are never mutated by the tracker. `timestamp_ms` is the clock used for every
/// cooldown, so replaying a recorded stream reproduces the same decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters (lower = better)
    pub accuracy_meters: f64,
    pub heading_deg: Option<f64>,
    pub speed_mps: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl PositionFix {
    /// Create a fix without heading or speed.
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            heading_deg: None,
            speed_mps: None,
            timestamp_ms,
        }
    }

    /// Create a fix at a coordinate.
    pub fn at(position: Coordinate, accuracy_meters: f64, timestamp_ms: u64) -> Self {
        Self::new(position.latitude, position.longitude, accuracy_meters, timestamp_ms)
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// A fix is usable when its position is valid and its accuracy is a real number.
    pub fn is_usable(&self) -> bool {
        self.coordinate().is_valid() && !self.accuracy_meters.is_nan()
    }
}

/// One instruction of a route, aligned to cumulative distance along the geometry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteStep {
    pub instruction: String,
    /// Street name, when the provider knows it
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub maneuver_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub maneuver_modifier: Option<String>,
}

impl RouteStep {
    pub fn new(instruction: impl Into<String>, distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            instruction: instruction.into(),
            name: None,
            distance_meters,
            duration_seconds,
            maneuver_type: None,
            maneuver_modifier: None,
        }
    }

    pub fn with_maneuver(mut self, maneuver_type: &str, modifier: Option<&str>) -> Self {
        self.maneuver_type = Some(maneuver_type.to_string());
        self.maneuver_modifier = modifier.map(str::to_string);
        self
    }
}

/// Route geometry: an immutable polyline in travel order.
///
/// Segment lengths (haversine) are computed once on construction so that remaining
/// distance is O(1) per fix. Geometries with fewer than two vertices are accepted; they
/// simply never match.
///
/// With the `serde` feature the wire shape is an ordered list of `[longitude, latitude]`
/// pairs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>"))]
pub struct RouteGeometry {
    coordinates: Vec<Coordinate>,
    segment_lengths: Vec<f64>,
    /// `length_from[i]` = length of segments `i..` (one extra trailing zero)
    length_from: Vec<f64>,
}

impl RouteGeometry {
    /// Create a geometry from coordinates in travel order.
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        let segment_lengths: Vec<f64> = coordinates
            .windows(2)
            .map(|w| geo_utils::haversine_distance(&w[0], &w[1]))
            .collect();

        let mut length_from = vec![0.0; segment_lengths.len() + 1];
        for i in (0..segment_lengths.len()).rev() {
            length_from[i] = length_from[i + 1] + segment_lengths[i];
        }

        Self { coordinates, segment_lengths, length_from }
    }

    /// Create a geometry from `[longitude, latitude]` pairs (GeoJSON order).
    pub fn from_lng_lat(pairs: &[[f64; 2]]) -> Self {
        Self::new(pairs.iter().map(|p| Coordinate::new(p[1], p[0])).collect())
    }

    /// Export as `[longitude, latitude]` pairs.
    pub fn to_lng_lat(&self) -> Vec<[f64; 2]> {
        self.coordinates.iter().map(|c| [c.longitude, c.latitude]).collect()
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn vertex_count(&self) -> usize {
        self.coordinates.len()
    }

    /// Number of segments (`vertex_count - 1`, or 0).
    pub fn segment_count(&self) -> usize {
        self.segment_lengths.len()
    }

    /// Endpoints of segment `index`.
    pub fn segment(&self, index: usize) -> Option<(&Coordinate, &Coordinate)> {
        Some((self.coordinates.get(index)?, self.coordinates.get(index + 1)?))
    }

    pub fn segment_length(&self, index: usize) -> f64 {
        self.segment_lengths.get(index).copied().unwrap_or(0.0)
    }

    /// Total length in meters.
    pub fn total_length(&self) -> f64 {
        self.length_from[0]
    }

    /// Summed length of every segment after `index`.
    pub fn length_after(&self, index: usize) -> f64 {
        self.length_from.get(index + 1).copied().unwrap_or(0.0)
    }
}

impl From<Vec<[f64; 2]>> for RouteGeometry {
    fn from(pairs: Vec<[f64; 2]>) -> Self {
        Self::from_lng_lat(&pairs)
    }
}

impl From<RouteGeometry> for Vec<[f64; 2]> {
    fn from(geometry: RouteGeometry) -> Self {
        geometry.to_lng_lat()
    }
}

/// Summary metrics of a route candidate, as used for scoring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub step_count: u32,
    /// Number of turn-like maneuvers (turns, forks, roundabouts...)
    pub turn_like_count: u32,
    /// Share of segments faster than the high-speed threshold (0..1)
    pub high_speed_ratio: f64,
}

impl RouteSummary {
    /// Derive a summary from a route's steps and per-segment speed annotations.
    pub fn from_steps(
        distance_meters: f64,
        duration_seconds: f64,
        steps: &[RouteStep],
        segment_speeds: &[f64],
    ) -> Self {
        Self {
            distance_meters,
            duration_seconds,
            step_count: steps.len() as u32,
            turn_like_count: scorer::count_turn_like(steps),
            high_speed_ratio: scorer::high_speed_ratio(segment_speeds),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Thresholds for the tracking pipeline.
///
/// All values are empirical; the defaults are the ones tuned on real rides and every
/// field can be overridden.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackingConfig {
    /// A windowed match closer than this skips the full-scan fallback.
    /// Default: 12.0 meters
    pub good_match_distance_m: f64,

    /// Segments scanned on each side of the hint when accuracy is good.
    /// Default: 18
    pub search_window: u32,

    /// Segments scanned on each side of the hint when accuracy is poor.
    /// Default: 6
    pub degraded_search_window: u32,

    /// Fixes less accurate than this use the degraded window, never fall back to a full
    /// scan, and do not update the hint.
    /// Default: 55.0 meters
    pub snap_max_accuracy_m: f64,

    /// Matched distance above which an on-route rider becomes off-route.
    /// Default: 40.0 meters
    pub off_route_enter_m: f64,

    /// Matched distance below which an off-route rider is back on route.
    /// Default: 28.0 meters
    pub off_route_exit_m: f64,

    /// Fixes less accurate than this cannot change the off-route state.
    /// Default: 60.0 meters
    pub off_route_max_accuracy_m: f64,

    /// Only fixes more accurate than this count towards a reroute.
    /// Default: 35.0 meters
    pub reroute_max_accuracy_m: f64,

    /// Consecutive eligible off-route fixes needed to reroute.
    /// Default: 2
    pub reroute_streak: u32,

    /// Minimum time between two reroutes.
    /// Default: 12000 ms
    pub reroute_cooldown_ms: u64,

    /// Minimum time between two off-route haptic pulses.
    /// Default: 6000 ms
    pub haptic_cooldown_ms: u64,

    /// Minimum time between two off-route notifications.
    /// Default: 15000 ms
    pub notification_cooldown_ms: u64,

    /// Minimum time between two maneuver-change pulses.
    /// Default: 3500 ms
    pub maneuver_feedback_cooldown_ms: u64,

    /// Maneuver changes are only announced within this distance of the maneuver.
    /// Default: 250.0 meters
    pub maneuver_feedback_distance_m: f64,

    /// Remaining distance below which the ride is considered arrived.
    /// Default: 25.0 meters
    pub arrival_distance_m: f64,

    /// Live speed is used for the ETA only inside (min, max).
    /// Default: 0.6 m/s
    pub min_plausible_speed_mps: f64,

    /// Default: 15.0 m/s (54 km/h)
    pub max_plausible_speed_mps: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            good_match_distance_m: 12.0,
            search_window: 18,
            degraded_search_window: 6,
            snap_max_accuracy_m: 55.0,
            off_route_enter_m: 40.0,
            off_route_exit_m: 28.0,
            off_route_max_accuracy_m: 60.0,
            reroute_max_accuracy_m: 35.0,
            reroute_streak: 2,
            reroute_cooldown_ms: 12_000,
            haptic_cooldown_ms: 6_000,
            notification_cooldown_ms: 15_000,
            maneuver_feedback_cooldown_ms: 3_500,
            maneuver_feedback_distance_m: 250.0,
            arrival_distance_m: 25.0,
            min_plausible_speed_mps: 0.6,
            max_plausible_speed_mps: 15.0,
        }
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info};
    use std::sync::{Mutex, MutexGuard};

    /// Flattened per-fix output for Kotlin/Swift.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiNavigationUpdate {
        pub segment_index: u32,
        pub t: f64,
        pub distance_to_route: f64,
        pub remaining_distance: f64,
        pub eta_seconds: f64,
        pub next_instruction: Option<String>,
        pub distance_to_next_maneuver: f64,
        pub off_route: bool,
        pub arrived: bool,
        /// Set when the host should calculate a new route and report it back
        pub reroute_request_id: Option<u64>,
        pub reroute_origin: Option<Coordinate>,
        pub haptic: bool,
        pub notify_off_route: bool,
        pub announce_instruction: Option<String>,
    }

    impl From<NavigationUpdate> for FfiNavigationUpdate {
        fn from(update: NavigationUpdate) -> Self {
            let mut haptic = false;
            let mut notify_off_route = false;
            let mut announce_instruction = None;
            for event in update.feedback {
                match event {
                    FeedbackEvent::OffRouteHaptic => haptic = true,
                    FeedbackEvent::OffRouteNotification => notify_off_route = true,
                    FeedbackEvent::ManeuverChanged { instruction } => {
                        announce_instruction = Some(instruction)
                    }
                }
            }

            Self {
                segment_index: update.matched.segment_index as u32,
                t: update.matched.t,
                distance_to_route: update.matched.distance_meters,
                remaining_distance: update.remaining_distance,
                eta_seconds: update.eta.seconds,
                next_instruction: update.next_instruction,
                distance_to_next_maneuver: update.distance_to_next_maneuver,
                off_route: update.off_route,
                arrived: update.arrived,
                reroute_request_id: update.reroute.as_ref().map(|r| r.request_id),
                reroute_origin: update.reroute.as_ref().map(|r| r.request.origin),
                haptic,
                notify_off_route,
                announce_instruction,
            }
        }
    }

    /// Navigation session handle owned by the mobile host.
    ///
    /// Route calculation stays on the host side: updates carry a reroute request id and
    /// the host answers with [`FfiNavigationSession::apply_route`].
    #[derive(uniffi::Object)]
    pub struct FfiNavigationSession {
        inner: Mutex<NavigationSession>,
    }

    impl FfiNavigationSession {
        fn session(&self) -> MutexGuard<'_, NavigationSession> {
            self.inner.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    #[uniffi::export]
    impl FfiNavigationSession {
        #[uniffi::constructor]
        pub fn new(config: TrackingConfig) -> Self {
            init_logging();
            Self { inner: Mutex::new(NavigationSession::new(config)) }
        }

        /// Start navigating a route (coordinates in travel order).
        pub fn start(
            &self,
            geometry: Vec<Coordinate>,
            steps: Vec<RouteStep>,
            summary: RouteSummary,
            destination: Option<Coordinate>,
            preference: RoutingPreference,
        ) {
            info!("[RouteTrackerRust] start with {} vertices, {} steps", geometry.len(), steps.len());
            let draft = RouteDraft::new("route_0", RouteGeometry::new(geometry), steps, summary);
            let route = score_candidates(vec![draft], &preference).remove(0);
            self.session().start(route, destination, preference);
        }

        pub fn update(&self, fix: PositionFix) -> Option<FfiNavigationUpdate> {
            self.session().update(&fix).map(FfiNavigationUpdate::from)
        }

        /// Apply a route computed by the host for `request_id`.
        /// Returns false when the request was superseded.
        pub fn apply_route(
            &self,
            request_id: u64,
            geometry: Vec<Coordinate>,
            steps: Vec<RouteStep>,
            summary: RouteSummary,
        ) -> bool {
            let mut session = self.session();
            let preference = session.preference().clone();
            let draft = RouteDraft::new("route_0", RouteGeometry::new(geometry), steps, summary);
            let result = RouteResult::from_scored(score_candidates(vec![draft], &preference));
            let outcome = session.apply_route_result(request_id, result);
            debug!("[RouteTrackerRust] apply_route #{} -> {:?}", request_id, outcome);
            matches!(outcome, RouteApplyOutcome::Applied)
        }

        pub fn stop(&self) {
            self.session().stop();
        }

        pub fn cancel(&self) {
            self.session().cancel();
        }

        pub fn is_active(&self) -> bool {
            self.session().is_active()
        }
    }

    /// Match a single position against a polyline.
    #[uniffi::export]
    pub fn ffi_match_position(
        position: Coordinate,
        geometry: Vec<Coordinate>,
        hint_segment: Option<u32>,
        search_window: u32,
    ) -> Option<FfiMatch> {
        let geometry = RouteGeometry::new(geometry);
        let options = MatchOptions {
            hint_segment: hint_segment.map(|h| h as usize),
            search_window: search_window as usize,
            ..MatchOptions::default()
        };
        let m = match_position(&position, &geometry, &options);
        m.is_match().then(|| FfiMatch {
            segment_index: m.segment_index as u32,
            t: m.t,
            distance_meters: m.distance_meters,
        })
    }

    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiMatch {
        pub segment_index: u32,
        pub t: f64,
        pub distance_meters: f64,
    }

    /// Get default tracking configuration.
    #[uniffi::export]
    pub fn default_tracking_config() -> TrackingConfig {
        TrackingConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
