//! Seams to the outside world: route calculation and position delivery.

use futures::future::BoxFuture;
use futures::Stream;

use crate::scorer::{RouteCandidate, RoutingPreference};
use crate::{Coordinate, NavError, PositionFix, Result};

/// Input of a route calculation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    /// Intermediate stops, in order
    pub waypoints: Vec<Coordinate>,
    pub preference: RoutingPreference,
}

impl RouteRequest {
    pub fn new(origin: Coordinate, destination: Coordinate, preference: RoutingPreference) -> Self {
        Self { origin, destination, waypoints: Vec::new(), preference }
    }

    /// Origin, waypoints and destination in travel order.
    pub fn stops(&self) -> Vec<Coordinate> {
        let mut stops = Vec::with_capacity(self.waypoints.len() + 2);
        stops.push(self.origin);
        stops.extend(self.waypoints.iter().copied());
        stops.push(self.destination);
        stops
    }

    /// Reject requests a provider cannot answer.
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.stops().iter().find(|c| !c.is_valid()) {
            return Err(NavError::InvalidRequest(format!(
                "invalid coordinate ({}, {})",
                bad.latitude, bad.longitude
            )));
        }
        Ok(())
    }
}

/// Ranked output of a route calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// Highest safety score
    pub best: RouteCandidate,
    /// Every other candidate, best first
    pub alternatives: Vec<RouteCandidate>,
}

impl RouteResult {
    /// Build from candidates already sorted by [`crate::score_candidates`].
    pub fn from_scored(mut scored: Vec<RouteCandidate>) -> Result<Self> {
        if scored.is_empty() {
            return Err(NavError::NoRoute("provider returned no candidates".to_string()));
        }
        let best = scored.remove(0);
        Ok(Self { best, alternatives: scored })
    }

    /// All candidates, best first.
    pub fn all(&self) -> impl Iterator<Item = &RouteCandidate> {
        std::iter::once(&self.best).chain(self.alternatives.iter())
    }
}

/// Something that can calculate routes.
///
/// The returned future is `'static` so it can be held across fixes; dropping it cancels the
/// calculation.
pub trait RouteProvider {
    fn calculate(&self, request: RouteRequest) -> BoxFuture<'static, Result<RouteResult>>;
}

/// A failure of the platform position stream. Logged and skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location temporarily unavailable")]
    Unavailable,
    #[error("location error: {0}")]
    Other(String),
}

/// A stream of position fixes. Dropping it unsubscribes.
pub trait PositionSource: Stream<Item = std::result::Result<PositionFix, PositionError>> + Unpin {}

impl<S> PositionSource for S where S: Stream<Item = std::result::Result<PositionFix, PositionError>> + Unpin {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{score_candidates, RouteDraft};
    use crate::{RouteGeometry, RouteSummary};

    fn draft(id: &str, turns: u32) -> RouteDraft {
        RouteDraft::new(
            id,
            RouteGeometry::new(vec![]),
            vec![],
            RouteSummary {
                distance_meters: 1000.0,
                duration_seconds: 240.0,
                step_count: turns,
                turn_like_count: turns,
                high_speed_ratio: 0.0,
            },
        )
    }

    #[test]
    fn test_from_scored() {
        let scored = score_candidates(
            vec![draft("a", 9), draft("b", 2), draft("c", 5)],
            &RoutingPreference::default(),
        );
        let result = RouteResult::from_scored(scored).unwrap();

        assert_eq!(result.best.id, "b");
        let ids: Vec<&str> = result.all().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_from_scored_empty() {
        assert!(matches!(RouteResult::from_scored(vec![]), Err(NavError::NoRoute(_))));
    }

    #[test]
    fn test_request_stops_and_validation() {
        let mut request = RouteRequest::new(
            Coordinate::new(45.0, 6.0),
            Coordinate::new(45.1, 6.1),
            RoutingPreference::default(),
        );
        request.waypoints.push(Coordinate::new(45.05, 6.05));

        assert_eq!(request.stops().len(), 3);
        assert_eq!(request.stops()[1], Coordinate::new(45.05, 6.05));
        assert!(request.validate().is_ok());

        request.destination = Coordinate::new(95.0, 6.0);
        assert!(matches!(request.validate(), Err(NavError::InvalidRequest(_))));
    }
}
