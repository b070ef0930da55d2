//! Reroute decisions and request bookkeeping.
//!
//! A reroute needs sustained evidence: `streak` consecutive off-route fixes that are all
//! accurate enough, plus a cooldown since the last reroute. Every route calculation gets a
//! monotonically increasing id; only the completion carrying the most recent id may be
//! applied, so a slow calculation can never overwrite newer state.

use log::debug;

use crate::cooldown::Cooldown;
use crate::TrackingConfig;

#[derive(Debug, Clone)]
pub struct RerouteController {
    max_accuracy_m: f64,
    required_streak: u32,
    streak: u32,
    cooldown: Cooldown,
    /// Last id handed out; ids start at 1 and never repeat within a controller
    last_issued_id: u64,
    /// Id whose completion is still awaited
    pending_id: Option<u64>,
}

impl RerouteController {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            max_accuracy_m: config.reroute_max_accuracy_m,
            required_streak: config.reroute_streak.max(1),
            streak: 0,
            cooldown: Cooldown::new(config.reroute_cooldown_ms),
            last_issued_id: 0,
            pending_id: None,
        }
    }

    /// Current count of consecutive eligible off-route fixes.
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Timestamp of the last reroute issued by [`RerouteController::observe`].
    pub fn last_reroute_ms(&self) -> Option<u64> {
        self.cooldown.last_fired_ms()
    }

    /// Id of the calculation whose result is still awaited.
    pub fn pending_request(&self) -> Option<u64> {
        self.pending_id
    }

    /// Feed one fix. Returns a new request id when a reroute should be calculated now.
    pub fn observe(
        &mut self,
        off_route: bool,
        accuracy_m: f64,
        has_destination: bool,
        now_ms: u64,
    ) -> Option<u64> {
        if off_route && accuracy_m < self.max_accuracy_m {
            self.streak += 1;
        } else {
            self.streak = 0;
        }

        if self.streak < self.required_streak || !has_destination {
            return None;
        }
        if !self.cooldown.try_fire(now_ms) {
            debug!("[RerouteController] streak {} but cooling down", self.streak);
            return None;
        }

        self.streak = 0;
        Some(self.issue_request())
    }

    /// Hand out a new request id, superseding any pending one.
    pub fn issue_request(&mut self) -> u64 {
        self.last_issued_id += 1;
        self.pending_id = Some(self.last_issued_id);
        self.last_issued_id
    }

    /// Whether a completion for `request_id` may still be applied.
    pub fn is_current(&self, request_id: u64) -> bool {
        self.pending_id == Some(request_id)
    }

    /// Settle a completion. Returns false for stale ids, which must be discarded.
    pub fn complete(&mut self, request_id: u64) -> bool {
        if !self.is_current(request_id) {
            return false;
        }
        self.pending_id = None;
        true
    }

    /// Stop waiting for the pending calculation; its completion becomes stale.
    pub fn abandon_pending(&mut self) {
        self.pending_id = None;
    }

    /// Drop the streak only (after a route change).
    pub fn reset_streak(&mut self) {
        self.streak = 0;
    }

    /// Forget the pending request and every counter. Ids keep increasing so that
    /// completions from before the reset are still recognised as stale.
    pub fn reset(&mut self) {
        self.streak = 0;
        self.cooldown.reset();
        self.pending_id = None;
    }
}
