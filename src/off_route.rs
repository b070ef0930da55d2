//! Off-route detection with hysteresis.
//!
//! The rider goes off-route when the matched distance rises above `enter`, and only comes
//! back once it drops below the lower `exit` threshold. Fixes whose accuracy is worse than
//! the eligibility bound hold the current state, so a single degraded fix can never flip it.

use crate::TrackingConfig;

/// What a single update did to the off-route state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OffRouteTransition {
    Unchanged,
    /// On-route -> off-route
    Entered,
    /// Off-route -> on-route
    Exited,
}

/// Binary on/off-route state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct OffRouteMonitor {
    enter_m: f64,
    exit_m: f64,
    max_accuracy_m: f64,
    off_route: bool,
}

impl OffRouteMonitor {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            enter_m: config.off_route_enter_m,
            exit_m: config.off_route_exit_m,
            max_accuracy_m: config.off_route_max_accuracy_m,
            off_route: false,
        }
    }

    pub fn is_off_route(&self) -> bool {
        self.off_route
    }

    /// Feed one matched distance with the accuracy of the fix it came from.
    pub fn update(&mut self, distance_m: f64, accuracy_m: f64) -> OffRouteTransition {
        if !(accuracy_m <= self.max_accuracy_m) {
            return OffRouteTransition::Unchanged;
        }

        let was_off = self.off_route;
        self.off_route = if was_off {
            !(distance_m < self.exit_m)
        } else {
            distance_m > self.enter_m
        };

        match (was_off, self.off_route) {
            (false, true) => OffRouteTransition::Entered,
            (true, false) => OffRouteTransition::Exited,
            _ => OffRouteTransition::Unchanged,
        }
    }

    pub fn reset(&mut self) {
        self.off_route = false;
    }
}
