//! Remaining-time estimate.
//!
//! Uses the live speed when it is plausible for a bike, otherwise scales the route's
//! planned duration by the share of distance left.

use crate::{RouteSummary, TrackingConfig};

/// Where an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EtaSource {
    /// remaining / current speed
    LiveSpeed,
    /// remaining share of the planned duration
    Proportional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Eta {
    /// Seconds to arrival, never negative
    pub seconds: f64,
    pub source: EtaSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtaEstimator {
    min_speed_mps: f64,
    max_speed_mps: f64,
}

impl EtaEstimator {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            min_speed_mps: config.min_plausible_speed_mps,
            max_speed_mps: config.max_plausible_speed_mps,
        }
    }

    /// Estimate the time left for `remaining_m` meters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use route_tracker::{EtaEstimator, RouteSummary, TrackingConfig};
    ///
    /// let estimator = EtaEstimator::new(&TrackingConfig::default());
    /// let summary = RouteSummary::from_steps(1000.0, 600.0, &[], &[]);
    ///
    /// assert_eq!(estimator.estimate(100.0, Some(5.0), &summary).seconds, 20.0);
    /// assert_eq!(estimator.estimate(500.0, None, &summary).seconds, 300.0);
    /// ```
    pub fn estimate(&self, remaining_m: f64, speed_mps: Option<f64>, route: &RouteSummary) -> Eta {
        let live = speed_mps.filter(|&v| v > self.min_speed_mps && v < self.max_speed_mps);

        let (seconds, source) = match live {
            Some(speed) => (remaining_m / speed, EtaSource::LiveSpeed),
            None => {
                let share = if route.distance_meters > 1.0 {
                    remaining_m / route.distance_meters
                } else {
                    1.0
                };
                (share * route.duration_seconds, EtaSource::Proportional)
            }
        };

        Eta { seconds: seconds.max(0.0), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(distance: f64, duration: f64) -> RouteSummary {
        RouteSummary::from_steps(distance, duration, &[], &[])
    }

    fn estimator() -> EtaEstimator {
        EtaEstimator::new(&TrackingConfig::default())
    }

    #[test]
    fn test_live_speed() {
        let eta = estimator().estimate(100.0, Some(5.0), &summary(1000.0, 600.0));
        assert_eq!(eta.seconds, 20.0);
        assert_eq!(eta.source, EtaSource::LiveSpeed);
    }

    #[test]
    fn test_proportional_without_speed() {
        let eta = estimator().estimate(500.0, None, &summary(1000.0, 600.0));
        assert_eq!(eta.seconds, 300.0);
        assert_eq!(eta.source, EtaSource::Proportional);
    }

    #[test]
    fn test_implausible_speeds_fall_back() {
        let route = summary(1000.0, 600.0);
        for speed in [0.0, 0.6, 15.0, 40.0, -3.0, f64::NAN] {
            let eta = estimator().estimate(500.0, Some(speed), &route);
            assert_eq!(eta.source, EtaSource::Proportional, "speed {}", speed);
            assert_eq!(eta.seconds, 300.0);
        }
    }

    #[test]
    fn test_tiny_route_uses_full_duration() {
        let eta = estimator().estimate(0.5, None, &summary(0.8, 42.0));
        assert_eq!(eta.seconds, 42.0);

        let eta = estimator().estimate(10.0, None, &summary(0.0, 42.0));
        assert_eq!(eta.seconds, 42.0);
    }

    #[test]
    fn test_never_negative() {
        let eta = estimator().estimate(-50.0, Some(4.0), &summary(1000.0, 600.0));
        assert_eq!(eta.seconds, 0.0);

        let eta = estimator().estimate(100.0, None, &summary(1000.0, -600.0));
        assert_eq!(eta.seconds, 0.0);
    }

    #[test]
    fn test_monotonic_as_distance_decreases() {
        let route = summary(5000.0, 1200.0);
        for speed in [None, Some(4.2)] {
            let mut previous = f64::INFINITY;
            let mut remaining = 5000.0;
            while remaining >= 0.0 {
                let eta = estimator().estimate(remaining, speed, &route).seconds;
                assert!(eta <= previous);
                previous = eta;
                remaining -= 37.5;
            }
        }
    }
}
