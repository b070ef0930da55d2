//! # Route Safety Scoring
//!
//! Ranks route candidates by a "safety" heuristic: fewer turn-like maneuvers and fewer
//! fast segments are calmer, without tolerating a much longer ride.
//!
//! ## Algorithm
//! 1. Min-max normalize duration, distance, turn count and high-speed ratio across the set
//!    (0 = best, 1 = worst; 0 for everyone when all values are equal)
//! 2. Derive weights from the rider's preferences:
//!    - turns `0.45·quiet`, high speed `0.25·quiet`
//!    - time `0.25·(1 - 0.35·bike)`, distance `0.05·(1 - 0.6·bike)`
//! 3. `cost` = weighted mean of the normalized features
//! 4. `safety_score = round((1 - cost) · 100)`, sorted descending; ties keep input order

use crate::{RouteGeometry, RouteStep, RouteSummary};

/// Maneuver types that count as a turn for scoring.
pub const TURN_LIKE_MANEUVERS: [&str; 9] = [
    "turn",
    "merge",
    "fork",
    "roundabout",
    "roundabout turn",
    "on ramp",
    "off ramp",
    "end of road",
    "new name",
];

/// Segments faster than this (m/s, ~25 km/h) count as high-speed.
pub const HIGH_SPEED_THRESHOLD_MPS: f64 = 7.0;

/// Rider preferences, each in [0, 1].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RoutingPreference {
    /// Tolerance for detours that stay on bike infrastructure.
    /// Default: 1.0
    pub prefer_bike_lanes: f64,
    /// Weight given to avoiding turns and fast roads.
    /// Default: 0.7
    pub prefer_quiet_streets: f64,
}

impl Default for RoutingPreference {
    fn default() -> Self {
        Self {
            prefer_bike_lanes: 1.0,
            prefer_quiet_streets: 0.7,
        }
    }
}

/// Per-feature scores, 1 = best in the set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ScoreBreakdown {
    pub time: f64,
    pub distance: f64,
    pub turns: f64,
    pub calmness: f64,
}

/// A route as returned by a provider, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDraft {
    pub id: String,
    pub geometry: RouteGeometry,
    pub steps: Vec<RouteStep>,
    pub summary: RouteSummary,
}

impl RouteDraft {
    pub fn new(id: &str, geometry: RouteGeometry, steps: Vec<RouteStep>, summary: RouteSummary) -> Self {
        Self { id: id.to_string(), geometry, steps, summary }
    }
}

/// A scored route candidate. Immutable once scored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RouteCandidate {
    pub id: String,
    pub geometry: RouteGeometry,
    pub steps: Vec<RouteStep>,
    pub summary: RouteSummary,
    /// 0..100, higher is safer
    pub safety_score: u32,
    pub score_breakdown: ScoreBreakdown,
}

/// Count steps whose maneuver type is turn-like.
pub fn count_turn_like(steps: &[RouteStep]) -> u32 {
    steps
        .iter()
        .filter(|s| {
            s.maneuver_type
                .as_deref()
                .is_some_and(|t| TURN_LIKE_MANEUVERS.contains(&t))
        })
        .count() as u32
}

/// Share of speed annotations above [`HIGH_SPEED_THRESHOLD_MPS`]; 0 without annotations.
pub fn high_speed_ratio(segment_speeds: &[f64]) -> f64 {
    if segment_speeds.is_empty() {
        return 0.0;
    }
    let high = segment_speeds.iter().filter(|&&v| v > HIGH_SPEED_THRESHOLD_MPS).count();
    high as f64 / segment_speeds.len() as f64
}

#[inline]
fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Min/max of one feature across the candidate set.
#[derive(Debug, Clone, Copy)]
struct FeatureRange {
    min: f64,
    max: f64,
}

impl FeatureRange {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            Self { min: f64::INFINITY, max: f64::NEG_INFINITY },
            |r, v| Self { min: r.min.min(v), max: r.max.max(v) },
        )
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        (value - self.min) / (self.max - self.min)
    }
}

/// Score and rank candidates, safest first.
///
/// # Example
///
/// ```rust
/// use route_tracker::{score_candidates, RouteDraft, RouteGeometry, RouteSummary, RoutingPreference};
///
/// let summary = |duration: f64, turns: u32| RouteSummary {
///     distance_meters: 3000.0,
///     duration_seconds: duration,
///     step_count: turns,
///     turn_like_count: turns,
///     high_speed_ratio: 0.1,
/// };
/// let drafts = vec![
///     RouteDraft::new("route_0", RouteGeometry::new(vec![]), vec![], summary(600.0, 14)),
///     RouteDraft::new("route_1", RouteGeometry::new(vec![]), vec![], summary(660.0, 4)),
/// ];
///
/// let ranked = score_candidates(drafts, &RoutingPreference::default());
/// assert_eq!(ranked[0].id, "route_1"); // fewer turns wins
/// assert!(ranked[0].safety_score > ranked[1].safety_score);
/// ```
pub fn score_candidates(drafts: Vec<RouteDraft>, preference: &RoutingPreference) -> Vec<RouteCandidate> {
    let quiet = clamp01(preference.prefer_quiet_streets);
    let bike = clamp01(preference.prefer_bike_lanes);

    let durations = FeatureRange::of(drafts.iter().map(|d| d.summary.duration_seconds));
    let distances = FeatureRange::of(drafts.iter().map(|d| d.summary.distance_meters));
    let turns = FeatureRange::of(drafts.iter().map(|d| d.summary.turn_like_count as f64));
    let high_speeds = FeatureRange::of(drafts.iter().map(|d| d.summary.high_speed_ratio));

    let w_turns = 0.45 * quiet;
    let w_high_speed = 0.25 * quiet;
    let w_time = 0.25 * (1.0 - 0.35 * bike);
    let w_dist = 0.05 * (1.0 - 0.6 * bike);

    let sum_w = w_turns + w_high_speed + w_time + w_dist;
    let sum_w = if sum_w > 0.0 { sum_w } else { 1.0 };

    let mut scored: Vec<RouteCandidate> = drafts
        .into_iter()
        .map(|d| {
            let n_time = durations.normalize(d.summary.duration_seconds);
            let n_dist = distances.normalize(d.summary.distance_meters);
            let n_turns = turns.normalize(d.summary.turn_like_count as f64);
            let n_high_speed = high_speeds.normalize(d.summary.high_speed_ratio);

            // Lower is better
            let cost = (w_turns * n_turns + w_high_speed * n_high_speed + w_time * n_time + w_dist * n_dist)
                / sum_w;

            RouteCandidate {
                id: d.id,
                geometry: d.geometry,
                steps: d.steps,
                summary: d.summary,
                safety_score: ((1.0 - clamp01(cost)) * 100.0).round() as u32,
                score_breakdown: ScoreBreakdown {
                    time: 1.0 - clamp01(n_time),
                    distance: 1.0 - clamp01(n_dist),
                    turns: 1.0 - clamp01(n_turns),
                    calmness: 1.0 - clamp01(n_high_speed),
                },
            }
        })
        .collect();

    // sort_by is stable: equal scores keep provider order
    scored.sort_by(|a, b| b.safety_score.cmp(&a.safety_score));
    scored
}
