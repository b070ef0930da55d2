//! # Navigator
//!
//! Async driver around a [`NavigationSession`]: pulls fixes from a [`PositionSource`],
//! delivers feedback to a [`FeedbackSink`], and runs reroutes on a [`RouteProvider`].
//!
//! Everything happens on one task. The position stream and the in-flight route calculation
//! are multiplexed with `tokio::select!`, so fixes keep flowing while a route is computed.
//! At most one calculation is in flight: a newer request drops the older future, which
//! cancels it.

use futures::future::BoxFuture;
use futures::StreamExt;
use log::{debug, info, warn};

use crate::feedback::FeedbackSink;
use crate::provider::{PositionSource, RouteProvider, RouteRequest, RouteResult};
use crate::scorer::RoutingPreference;
use crate::session::{
    NavigationSession, NavigationUpdate, RerouteRequest, RouteApplyOutcome, SessionState,
};
use crate::{Coordinate, PositionFix, Result, TrackingConfig};

struct InFlight {
    request_id: u64,
    future: BoxFuture<'static, Result<RouteResult>>,
}

pub struct Navigator<P, F> {
    session: NavigationSession,
    provider: P,
    feedback: F,
    in_flight: Option<InFlight>,
}

impl<P: RouteProvider, F: FeedbackSink> Navigator<P, F> {
    pub fn new(config: TrackingConfig, provider: P, feedback: F) -> Self {
        Self {
            session: NavigationSession::new(config),
            provider,
            feedback,
            in_flight: None,
        }
    }

    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Whether a route calculation is running.
    pub fn has_pending_route(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Calculate routes without touching the session.
    pub async fn plan(&self, request: RouteRequest) -> Result<RouteResult> {
        request.validate()?;
        self.provider.calculate(request).await
    }

    /// Plan a route from `origin` to `destination` and start navigating the best candidate.
    pub async fn start(
        &mut self,
        origin: Coordinate,
        destination: Coordinate,
        preference: RoutingPreference,
    ) -> Result<()> {
        let result = self
            .plan(RouteRequest::new(origin, destination, preference.clone()))
            .await?;
        self.start_route(result, Some(destination), preference);
        Ok(())
    }

    /// Start navigating an already calculated route.
    pub fn start_route(
        &mut self,
        result: RouteResult,
        destination: Option<Coordinate>,
        preference: RoutingPreference,
    ) {
        self.in_flight = None;
        self.session.start_result(result, destination, preference);
    }

    /// Ride the alternative with `id` instead, cancelling any route calculation.
    pub fn select_alternative(&mut self, id: &str) -> bool {
        if !self.session.select_alternative(id) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Stop navigating, cancelling any route calculation.
    pub fn stop(&mut self) {
        self.in_flight = None;
        self.session.stop();
    }

    /// Abort navigating, cancelling any route calculation.
    pub fn cancel(&mut self) {
        self.in_flight = None;
        self.session.cancel();
    }

    /// Recalculate from `origin` now, outside of the off-route flow.
    /// Returns false when the session cannot reroute (inactive, no destination).
    pub fn recalculate(&mut self, origin: Coordinate) -> bool {
        match self.session.request_route(origin) {
            Some(request) => {
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    /// Feed one fix through the session, delivering feedback and launching reroutes.
    pub fn handle_fix(&mut self, fix: PositionFix) -> Option<NavigationUpdate> {
        let update = self.session.update(&fix)?;

        for event in &update.feedback {
            event.dispatch(&self.feedback);
        }
        if let Some(request) = &update.reroute {
            self.dispatch(request.clone());
        }
        if update.arrived {
            self.in_flight = None;
        }

        Some(update)
    }

    /// Hand a route calculation result to the session.
    pub fn handle_route_result(
        &mut self,
        request_id: u64,
        result: Result<RouteResult>,
    ) -> RouteApplyOutcome {
        self.session.apply_route_result(request_id, result)
    }

    fn dispatch(&mut self, reroute: RerouteRequest) {
        if let Some(previous) = self.in_flight.take() {
            debug!("[Navigator] dropping route calculation #{}", previous.request_id);
        }
        let future = self.provider.calculate(reroute.request);
        self.in_flight = Some(InFlight { request_id: reroute.request_id, future });
    }

    /// Drive the session until it stops or `positions` ends.
    ///
    /// `on_update` sees every derived update, in fix order. Position errors are logged and
    /// skipped. Returns the session state at exit.
    pub async fn run<S, U>(&mut self, mut positions: S, mut on_update: U) -> SessionState
    where
        S: PositionSource,
        U: FnMut(&NavigationUpdate),
    {
        info!("[Navigator] running");

        while self.session.is_active() {
            tokio::select! {
                biased;

                (request_id, result) = await_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    let outcome = self.handle_route_result(request_id, result);
                    debug!("[Navigator] route calculation #{} -> {:?}", request_id, outcome);
                }

                item = positions.next() => match item {
                    Some(Ok(fix)) => {
                        if let Some(update) = self.handle_fix(fix) {
                            on_update(&update);
                        }
                    }
                    Some(Err(e)) => warn!("[Navigator] position error: {}", e),
                    None => {
                        info!("[Navigator] position stream ended");
                        break;
                    }
                },
            }
        }

        info!("[Navigator] finished in state {:?}", self.session.state());
        self.session.state()
    }
}

async fn await_in_flight(in_flight: &mut Option<InFlight>) -> (u64, Result<RouteResult>) {
    match in_flight {
        Some(calculation) => (calculation.request_id, (&mut calculation.future).await),
        None => std::future::pending().await,
    }
}
