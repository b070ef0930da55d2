//! # Navigation Session
//!
//! One explicit value owning all per-ride tracking state: the selected route, the map
//! matching hint, off-route hysteresis, reroute streak and cooldowns, and feedback clocks.
//!
//! The session does no I/O. [`NavigationSession::update`] consumes one fix and returns
//! everything that changed, including feedback to deliver and, when a reroute is due, a
//! [`RerouteRequest`] for the caller to calculate. The result comes back through
//! [`NavigationSession::apply_route_result`], which discards anything but the latest request.
//!
//! ## Lifecycle
//! ```text
//! NotStarted --start--> Active --update*--> Active
//!                         |
//!                         +--stop / cancel / arrival--> Stopped --start--> Active
//! ```
//! `reset` returns to `NotStarted` from anywhere.

use log::{debug, info, warn};

use crate::eta::{Eta, EtaEstimator};
use crate::feedback::{FeedbackEvent, FeedbackGate};
use crate::matcher::{match_position, MatchOptions, MatchResult};
use crate::off_route::{OffRouteMonitor, OffRouteTransition};
use crate::progress::ProgressTracker;
use crate::provider::{RouteRequest, RouteResult};
use crate::reroute::RerouteController;
use crate::scorer::{RouteCandidate, RoutingPreference};
use crate::{Coordinate, NavError, PositionFix, Result, TrackingConfig};

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    Stopped,
    Cancelled,
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    NotStarted,
    Active,
    Stopped(StopReason),
}

/// A route calculation the caller should run and report back with `request_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RerouteRequest {
    pub request_id: u64,
    pub request: RouteRequest,
}

/// Everything the session derived from one fix.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationUpdate {
    pub matched: MatchResult,
    pub remaining_distance: f64,
    pub traveled_distance: f64,
    pub eta: Eta,
    pub step_index: Option<usize>,
    pub next_instruction: Option<String>,
    pub distance_to_next_maneuver: f64,
    pub off_route: bool,
    pub transition: OffRouteTransition,
    /// Feedback due now, already rate limited
    pub feedback: Vec<FeedbackEvent>,
    pub reroute: Option<RerouteRequest>,
    /// The fix ended the ride; the session is now stopped
    pub arrived: bool,
}

/// What happened to a route calculation result.
#[derive(Debug)]
pub enum RouteApplyOutcome {
    /// The route replaced the current one
    Applied,
    /// A newer request superseded this one, or the session is no longer active
    Stale,
    /// The calculation failed; the current route is kept
    Failed(NavError),
}

#[derive(Debug)]
pub struct NavigationSession {
    config: TrackingConfig,
    state: SessionState,
    route: Option<RouteCandidate>,
    alternatives: Vec<RouteCandidate>,
    destination: Option<Coordinate>,
    preference: RoutingPreference,
    progress: ProgressTracker,
    off_route: OffRouteMonitor,
    reroute: RerouteController,
    eta: EtaEstimator,
    feedback: FeedbackGate,
    last_update: Option<NavigationUpdate>,
}

impl NavigationSession {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            state: SessionState::NotStarted,
            route: None,
            alternatives: Vec::new(),
            destination: None,
            preference: RoutingPreference::default(),
            progress: ProgressTracker::new(),
            off_route: OffRouteMonitor::new(&config),
            reroute: RerouteController::new(&config),
            eta: EtaEstimator::new(&config),
            feedback: FeedbackGate::new(&config),
            last_update: None,
            config,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The route being followed.
    pub fn route(&self) -> Option<&RouteCandidate> {
        self.route.as_ref()
    }

    /// Alternatives returned with the last applied route result.
    pub fn alternatives(&self) -> &[RouteCandidate] {
        &self.alternatives
    }

    pub fn destination(&self) -> Option<Coordinate> {
        self.destination
    }

    pub fn preference(&self) -> &RoutingPreference {
        &self.preference
    }

    pub fn is_off_route(&self) -> bool {
        self.off_route.is_off_route()
    }

    pub fn reroute_streak(&self) -> u32 {
        self.reroute.streak()
    }

    /// Id of the route calculation still awaited, if any.
    pub fn pending_request(&self) -> Option<u64> {
        self.reroute.pending_request()
    }

    /// The latest update produced by [`NavigationSession::update`].
    pub fn last_update(&self) -> Option<&NavigationUpdate> {
        self.last_update.as_ref()
    }

    /// Start (or restart) navigating `route`.
    ///
    /// Without a destination the session still tracks progress but never reroutes.
    pub fn start(
        &mut self,
        route: RouteCandidate,
        destination: Option<Coordinate>,
        preference: RoutingPreference,
    ) {
        self.clear_tracking();
        info!(
            "[NavigationSession] start on '{}' ({:.0}m, {} steps, safety {})",
            route.id,
            route.summary.distance_meters,
            route.steps.len(),
            route.safety_score
        );
        self.route = Some(route);
        self.alternatives.clear();
        self.destination = destination;
        self.preference = preference;
        self.state = SessionState::Active;
    }

    /// Start navigating the best candidate of `result`, keeping its alternatives selectable.
    pub fn start_result(
        &mut self,
        result: RouteResult,
        destination: Option<Coordinate>,
        preference: RoutingPreference,
    ) {
        self.start(result.best, destination, preference);
        self.alternatives = result.alternatives;
    }

    /// Switch to the alternative with `id`; the current route becomes an alternative.
    /// A pending calculation is abandoned. Returns false when no alternative has that id
    /// or the session is not active.
    pub fn select_alternative(&mut self, id: &str) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        let Some(index) = self.alternatives.iter().position(|c| c.id == id) else {
            return false;
        };

        let chosen = self.alternatives.remove(index);
        let mut alternatives = std::mem::take(&mut self.alternatives);
        if let Some(current) = self.route.take() {
            alternatives.insert(0, current);
        }
        info!("[NavigationSession] switching to alternative '{}' (safety {})", chosen.id, chosen.safety_score);
        self.reroute.abandon_pending();
        self.replace_route(chosen, alternatives);
        true
    }

    fn replace_route(&mut self, route: RouteCandidate, alternatives: Vec<RouteCandidate>) {
        self.route = Some(route);
        self.alternatives = alternatives;
        self.progress.reset();
        self.off_route.reset();
        self.reroute.reset_streak();
        self.feedback.forget_instruction();
    }

    /// Stop navigating. Pending route calculations become stale.
    pub fn stop(&mut self) {
        self.finish(StopReason::Stopped);
    }

    /// Abort navigating. Pending route calculations become stale.
    pub fn cancel(&mut self) {
        self.finish(StopReason::Cancelled);
    }

    /// Back to `NotStarted`, dropping the route and destination.
    pub fn reset(&mut self) {
        self.clear_tracking();
        self.route = None;
        self.alternatives.clear();
        self.destination = None;
        self.state = SessionState::NotStarted;
    }

    fn finish(&mut self, reason: StopReason) {
        if self.state != SessionState::Active {
            return;
        }
        info!("[NavigationSession] {:?}", reason);
        self.clear_tracking();
        self.state = SessionState::Stopped(reason);
    }

    fn clear_tracking(&mut self) {
        self.progress.reset();
        self.off_route.reset();
        self.reroute.reset();
        self.feedback.reset();
        self.last_update = None;
    }

    /// Process one fix.
    ///
    /// Returns `None` when nothing can be derived from it: the session is not active, the
    /// fix is unusable, or the route geometry cannot be matched. An unusable fix counts as
    /// unacceptable accuracy and restarts the reroute streak; nothing else is touched.
    pub fn update(&mut self, fix: &PositionFix) -> Option<NavigationUpdate> {
        if self.state != SessionState::Active {
            return None;
        }
        let route = self.route.as_ref()?;
        if !fix.is_usable() {
            // A fix without accuracy breaks the off-route evidence chain
            debug!("[NavigationSession] skipping unusable fix at {}", fix.timestamp_ms);
            self.reroute.reset_streak();
            return None;
        }

        // Poor fixes search a narrow window and never jump across the route
        let accurate = fix.accuracy_meters <= self.config.snap_max_accuracy_m;
        let window = if accurate {
            self.config.search_window
        } else {
            self.config.degraded_search_window
        };
        let options = MatchOptions {
            hint_segment: self.progress.hint(),
            search_window: window as usize,
            fallback_to_full_scan: accurate,
            good_match_distance_m: self.config.good_match_distance_m,
        };

        let matched = match_position(&fix.coordinate(), &route.geometry, &options);
        if !matched.is_match() {
            debug!("[NavigationSession] no match on '{}'", route.id);
            return None;
        }

        let progress = self.progress.update(
            &route.geometry,
            &route.steps,
            route.summary.distance_meters,
            matched,
            accurate,
        );
        debug!(
            "[NavigationSession] seg={} t={:.2} d={:.1}m acc={:.0}m remaining={:.0}m",
            matched.segment_index,
            matched.t,
            matched.distance_meters,
            fix.accuracy_meters,
            progress.remaining_distance
        );

        let transition = self.off_route.update(matched.distance_meters, fix.accuracy_meters);
        let off_route = self.off_route.is_off_route();
        let eta = self.eta.estimate(progress.remaining_distance, fix.speed_mps, &route.summary);

        let next_instruction = progress
            .step_index
            .and_then(|i| route.steps.get(i))
            .map(|s| s.instruction.clone());

        let now = fix.timestamp_ms;
        let mut feedback = Vec::new();
        match transition {
            OffRouteTransition::Entered => {
                info!("[NavigationSession] off route ({:.0}m from '{}')", matched.distance_meters, route.id);
                feedback.extend(self.feedback.off_route_entered(now));
            }
            OffRouteTransition::Exited => {
                info!("[NavigationSession] back on route ({:.0}m)", matched.distance_meters);
            }
            OffRouteTransition::Unchanged => {}
        }
        if let Some(instruction) = next_instruction.as_deref() {
            feedback.extend(self.feedback.maneuver(instruction, progress.distance_to_next_maneuver, now));
        }

        let arrived = progress.remaining_distance < self.config.arrival_distance_m;
        let reroute = if arrived {
            None
        } else {
            self.reroute
                .observe(off_route, fix.accuracy_meters, self.destination.is_some(), now)
                .zip(self.destination)
                .map(|(request_id, destination)| {
                    info!("[NavigationSession] reroute #{} requested", request_id);
                    RerouteRequest {
                        request_id,
                        request: RouteRequest::new(fix.coordinate(), destination, self.preference.clone()),
                    }
                })
        };

        let update = NavigationUpdate {
            matched,
            remaining_distance: progress.remaining_distance,
            traveled_distance: progress.traveled_distance,
            eta,
            step_index: progress.step_index,
            next_instruction,
            distance_to_next_maneuver: progress.distance_to_next_maneuver,
            off_route,
            transition,
            feedback,
            reroute,
            arrived,
        };

        if arrived {
            info!("[NavigationSession] arrived ({:.0}m left)", update.remaining_distance);
            self.finish(StopReason::Arrived);
        }
        self.last_update = Some(update.clone());
        Some(update)
    }

    /// Ask for a route from `origin` to the destination outside of the off-route flow
    /// (e.g. the rider changed preferences). Supersedes any pending request.
    pub fn request_route(&mut self, origin: Coordinate) -> Option<RerouteRequest> {
        if self.state != SessionState::Active {
            return None;
        }
        let destination = self.destination?;
        let request_id = self.reroute.issue_request();
        info!("[NavigationSession] route #{} requested manually", request_id);
        Some(RerouteRequest {
            request_id,
            request: RouteRequest::new(origin, destination, self.preference.clone()),
        })
    }

    /// Change the rider's preferences for future calculations.
    pub fn set_preference(&mut self, preference: RoutingPreference) {
        self.preference = preference;
    }

    /// Hand back the result of request `request_id`.
    pub fn apply_route_result(&mut self, request_id: u64, result: Result<RouteResult>) -> RouteApplyOutcome {
        if self.state != SessionState::Active || !self.reroute.complete(request_id) {
            debug!("[NavigationSession] discarding stale route result #{}", request_id);
            return RouteApplyOutcome::Stale;
        }

        match result {
            Ok(result) => {
                info!(
                    "[NavigationSession] applying route #{} '{}' (safety {}, {} alternatives)",
                    request_id,
                    result.best.id,
                    result.best.safety_score,
                    result.alternatives.len()
                );
                self.replace_route(result.best, result.alternatives);
                RouteApplyOutcome::Applied
            }
            Err(e) => {
                warn!("[NavigationSession] route #{} failed, keeping current route: {}", request_id, e);
                RouteApplyOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::offset_by_meters;
    use crate::scorer::{score_candidates, RouteDraft};
    use crate::{RouteGeometry, RouteStep, RouteSummary};

    const ORIGIN_LAT: f64 = 45.0;
    const ORIGIN_LNG: f64 = 6.0;

    /// ~2km straight north, 20 vertices ~100m apart.
    fn north_geometry() -> RouteGeometry {
        RouteGeometry::new(
            (0..=20)
                .map(|i| Coordinate::new(ORIGIN_LAT + i as f64 * 0.0009, ORIGIN_LNG))
                .collect(),
        )
    }

    fn candidate(id: &str, geometry: RouteGeometry) -> RouteCandidate {
        let total = geometry.total_length();
        let steps = vec![
            RouteStep::new("Head north", total / 2.0, 240.0),
            RouteStep::new("Continue north", total / 2.0, 240.0),
        ];
        let summary = RouteSummary::from_steps(total, 480.0, &steps, &[]);
        score_candidates(vec![RouteDraft::new(id, geometry, steps, summary)], &RoutingPreference::default())
            .remove(0)
    }

    fn destination() -> Coordinate {
        Coordinate::new(ORIGIN_LAT + 0.018, ORIGIN_LNG)
    }

    fn started() -> NavigationSession {
        let mut session = NavigationSession::new(TrackingConfig::default());
        session.start(candidate("main", north_geometry()), Some(destination()), RoutingPreference::default());
        session
    }

    /// Fix `along_m` north of the origin and `east_m` off the route.
    fn fix(along_m: f64, east_m: f64, accuracy: f64, ts: u64) -> PositionFix {
        let p = offset_by_meters(&Coordinate::new(ORIGIN_LAT, ORIGIN_LNG), east_m, along_m);
        PositionFix::at(p, accuracy, ts)
    }

    #[test]
    fn test_not_started_ignores_fixes() {
        let mut session = NavigationSession::new(TrackingConfig::default());
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.update(&fix(100.0, 0.0, 5.0, 0)).is_none());
    }

    #[test]
    fn test_on_route_progress() {
        let mut session = started();
        let total = session.route().unwrap().summary.distance_meters;

        let update = session.update(&fix(500.0, 3.0, 8.0, 1_000).with_speed(5.0)).unwrap();
        assert!(!update.off_route);
        assert!((update.matched.distance_meters - 3.0).abs() < 0.1);
        assert!((update.traveled_distance - 500.0).abs() < 1.0);
        assert!((update.remaining_distance - (total - 500.0)).abs() < 1.0);
        assert!((update.eta.seconds - update.remaining_distance / 5.0).abs() < 1e-9);
        assert_eq!(update.step_index, Some(0));
        assert_eq!(update.next_instruction.as_deref(), Some("Head north"));
        assert!(update.reroute.is_none());
        assert!(!update.arrived);
        assert_eq!(session.last_update(), Some(&update));
    }

    #[test]
    fn test_maneuver_feedback_near_change() {
        let mut session = started();

        // Far from the end of step 0: nothing announced
        let update = session.update(&fix(100.0, 0.0, 8.0, 1_000)).unwrap();
        assert!(update.feedback.is_empty());

        let update = session.update(&fix(800.0, 0.0, 8.0, 2_000)).unwrap();
        assert_eq!(
            update.feedback,
            vec![FeedbackEvent::ManeuverChanged { instruction: "Head north".into() }]
        );

        let update = session.update(&fix(850.0, 0.0, 8.0, 3_000)).unwrap();
        assert!(update.feedback.is_empty());
    }

    #[test]
    fn test_off_route_then_single_reroute() {
        let mut session = started();
        session.update(&fix(300.0, 0.0, 10.0, 1_000)).unwrap();

        let first = session.update(&fix(400.0, 80.0, 20.0, 2_000)).unwrap();
        assert!(first.off_route);
        assert_eq!(first.transition, OffRouteTransition::Entered);
        assert!(first.feedback.contains(&FeedbackEvent::OffRouteHaptic));
        assert!(first.feedback.contains(&FeedbackEvent::OffRouteNotification));
        assert!(first.reroute.is_none());

        let second = session.update(&fix(410.0, 80.0, 20.0, 3_000)).unwrap();
        let reroute = second.reroute.expect("second off-route fix reroutes");
        assert_eq!(reroute.request.destination, destination());
        assert!((reroute.request.origin.longitude - ORIGIN_LNG) > 0.0);
        assert_eq!(session.pending_request(), Some(reroute.request_id));

        let third = session.update(&fix(420.0, 80.0, 20.0, 4_000)).unwrap();
        assert!(third.reroute.is_none());
        let fourth = session.update(&fix(430.0, 80.0, 20.0, 5_000)).unwrap();
        assert!(fourth.reroute.is_none());
    }

    #[test]
    fn test_poor_accuracy_never_reroutes() {
        let mut session = started();
        for i in 0..10 {
            let update = session.update(&fix(400.0, 80.0, 40.0, i * 1_000)).unwrap();
            assert!(update.off_route);
            assert!(update.reroute.is_none());
        }
    }

    #[test]
    fn test_no_destination_never_reroutes() {
        let mut session = NavigationSession::new(TrackingConfig::default());
        session.start(candidate("main", north_geometry()), None, RoutingPreference::default());
        for i in 0..5 {
            assert!(session.update(&fix(400.0, 80.0, 10.0, i * 1_000)).unwrap().reroute.is_none());
        }
        assert!(session.request_route(Coordinate::new(45.0, 6.0)).is_none());
    }

    #[test]
    fn test_apply_reroute_result() {
        let mut session = started();
        session.update(&fix(400.0, 80.0, 10.0, 1_000));
        let reroute = session.update(&fix(400.0, 80.0, 10.0, 2_000)).unwrap().reroute.unwrap();

        // New route starts where the rider is
        let start = offset_by_meters(&Coordinate::new(ORIGIN_LAT, ORIGIN_LNG), 80.0, 400.0);
        let geometry = RouteGeometry::new(vec![start, destination()]);
        let result = RouteResult::from_scored(vec![candidate("detour", geometry)]);

        let outcome = session.apply_route_result(reroute.request_id, result);
        assert!(matches!(outcome, RouteApplyOutcome::Applied));
        assert_eq!(session.route().unwrap().id, "detour");
        assert!(!session.is_off_route());
        assert_eq!(session.reroute_streak(), 0);
        assert_eq!(session.pending_request(), None);

        let update = session.update(&fix(450.0, 80.0, 10.0, 3_000)).unwrap();
        assert!(!update.off_route);
        assert!(update.matched.distance_meters < 5.0);
    }

    #[test]
    fn test_stale_and_failed_results() {
        let mut session = started();
        let here = Coordinate::new(ORIGIN_LAT, ORIGIN_LNG);
        let older = session.request_route(here).unwrap();
        let newer = session.request_route(here).unwrap();
        assert!(newer.request_id > older.request_id);

        let detour = || RouteResult::from_scored(vec![candidate("detour", north_geometry())]);
        assert!(matches!(session.apply_route_result(older.request_id, detour()), RouteApplyOutcome::Stale));
        assert_eq!(session.route().unwrap().id, "main");

        let failed = session.apply_route_result(newer.request_id, Err(NavError::Provider("offline".into())));
        assert!(matches!(failed, RouteApplyOutcome::Failed(NavError::Provider(_))));
        assert_eq!(session.route().unwrap().id, "main");
        assert!(session.is_active());
    }

    #[test]
    fn test_stop_makes_pending_stale() {
        let mut session = started();
        let pending = session.request_route(Coordinate::new(ORIGIN_LAT, ORIGIN_LNG)).unwrap();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped(StopReason::Stopped));

        let result = RouteResult::from_scored(vec![candidate("late", north_geometry())]);
        assert!(matches!(session.apply_route_result(pending.request_id, result), RouteApplyOutcome::Stale));
        assert!(session.update(&fix(100.0, 0.0, 5.0, 10_000)).is_none());

        // Restarting does not resurrect the old request
        session.start(candidate("main", north_geometry()), Some(destination()), RoutingPreference::default());
        let result = RouteResult::from_scored(vec![candidate("late", north_geometry())]);
        assert!(matches!(session.apply_route_result(pending.request_id, result), RouteApplyOutcome::Stale));
    }

    #[test]
    fn test_arrival_stops_session() {
        let mut session = started();
        let total = session.route().unwrap().summary.distance_meters;

        let update = session.update(&fix(total - 10.0, 30.0, 30.0, 1_000)).unwrap();
        assert!(update.arrived);
        assert!(update.reroute.is_none());
        assert_eq!(session.state(), SessionState::Stopped(StopReason::Arrived));
        assert!(session.update(&fix(total, 0.0, 5.0, 2_000)).is_none());
    }

    #[test]
    fn test_unusable_fix_and_degenerate_route() {
        let mut session = started();
        assert!(session.update(&PositionFix::new(f64::NAN, 6.0, 5.0, 0)).is_none());
        assert!(session.update(&PositionFix::new(45.0, 6.0, f64::NAN, 0)).is_none());

        let mut degenerate = NavigationSession::new(TrackingConfig::default());
        degenerate.start(
            candidate("dot", RouteGeometry::new(vec![Coordinate::new(45.0, 6.0)])),
            Some(destination()),
            RoutingPreference::default(),
        );
        assert!(degenerate.update(&fix(0.0, 0.0, 5.0, 0)).is_none());
        assert!(degenerate.last_update().is_none());
        assert!(degenerate.is_active());
    }

    #[test]
    fn test_low_accuracy_fix_keeps_hint() {
        let mut session = started();
        session.update(&fix(150.0, 0.0, 8.0, 1_000)).unwrap();
        let hint = session.progress.hint();

        // Wild low-accuracy jump: matched locally, hint untouched
        session.update(&fix(1_800.0, 0.0, 80.0, 2_000)).unwrap();
        assert_eq!(session.progress.hint(), hint);
    }

    #[test]
    fn test_unusable_fix_breaks_off_route_streak() {
        let mut session = started();

        let first = session.update(&fix(400.0, 80.0, 20.0, 1_000)).unwrap();
        assert!(first.off_route);
        assert_eq!(session.reroute_streak(), 1);

        let mut blind = fix(405.0, 80.0, 20.0, 2_000);
        blind.accuracy_meters = f64::NAN;
        assert!(session.update(&blind).is_none());
        assert_eq!(session.reroute_streak(), 0);

        // Needs two fresh consecutive fixes again
        let third = session.update(&fix(410.0, 80.0, 20.0, 3_000)).unwrap();
        assert!(third.reroute.is_none());
        assert_eq!(session.reroute_streak(), 1);
        assert!(session.update(&fix(415.0, 80.0, 20.0, 4_000)).unwrap().reroute.is_some());
    }

    #[test]
    fn test_preference_change_flows_into_requests() {
        let mut session = started();
        let quiet = RoutingPreference { prefer_bike_lanes: 0.2, prefer_quiet_streets: 1.0 };
        session.set_preference(quiet.clone());

        let request = session.request_route(Coordinate::new(ORIGIN_LAT, ORIGIN_LNG)).unwrap();
        assert_eq!(request.request.preference, quiet);
        assert_eq!(session.preference(), &quiet);
    }

    #[test]
    fn test_select_alternative() {
        let mut session = NavigationSession::new(TrackingConfig::default());
        let detour = RouteGeometry::new(vec![
            Coordinate::new(ORIGIN_LAT, ORIGIN_LNG),
            offset_by_meters(&Coordinate::new(ORIGIN_LAT, ORIGIN_LNG), 300.0, 1_000.0),
            destination(),
        ]);
        let result = RouteResult {
            best: candidate("route_0", north_geometry()),
            alternatives: vec![candidate("route_1", detour)],
        };
        session.start_result(result, Some(destination()), RoutingPreference::default());
        assert_eq!(session.alternatives().len(), 1);

        // Off the main route, but on the detour
        let on_detour = offset_by_meters(&Coordinate::new(ORIGIN_LAT, ORIGIN_LNG), 150.0, 500.0);
        let update = session.update(&PositionFix::at(on_detour, 10.0, 1_000)).unwrap();
        assert!(update.off_route);
        let pending = session.request_route(on_detour).unwrap();

        assert!(!session.select_alternative("route_9"));
        assert!(session.select_alternative("route_1"));
        assert_eq!(session.pending_request(), None);
        let late = RouteResult { best: candidate("route_2", north_geometry()), alternatives: vec![] };
        assert!(matches!(
            session.apply_route_result(pending.request_id, Ok(late)),
            RouteApplyOutcome::Stale
        ));
        assert_eq!(session.route().unwrap().id, "route_1");
        let ids: Vec<&str> = session.alternatives().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["route_0"]);
        assert!(!session.is_off_route());

        let update = session.update(&PositionFix::at(on_detour, 10.0, 2_000)).unwrap();
        assert!(!update.off_route);
        assert!(update.matched.distance_meters < 1.0);

        session.stop();
        assert!(!session.select_alternative("route_0"));
    }

    #[test]
    fn test_cancel_and_reset() {
        let mut session = started();
        session.cancel();
        assert_eq!(session.state(), SessionState::Stopped(StopReason::Cancelled));
        assert!(session.route().is_some());

        session.reset();
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.route().is_none());
        assert!(session.destination().is_none());
    }
}
