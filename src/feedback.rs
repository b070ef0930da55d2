//! Rider feedback: haptics, notifications and maneuver announcements.
//!
//! The session decides *when* feedback is due ([`FeedbackGate`]) and hands out
//! [`FeedbackEvent`]s; delivering them is the platform's job ([`FeedbackSink`]).
//! Delivery is best effort: a failing sink is logged and otherwise ignored.

use log::debug;

use crate::cooldown::Cooldown;
use crate::TrackingConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback not supported on this device")]
    Unsupported,
    #[error("feedback permission denied")]
    PermissionDenied,
    #[error("feedback failed: {0}")]
    Failed(String),
}

/// Platform side of rider feedback. Every method defaults to a no-op.
pub trait FeedbackSink {
    fn off_route_haptic(&self) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn notify_off_route(&self) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn notify_maneuver_change(&self, _instruction: &str) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {}

impl<S: FeedbackSink + ?Sized> FeedbackSink for &S {
    fn off_route_haptic(&self) -> Result<(), FeedbackError> {
        (**self).off_route_haptic()
    }

    fn notify_off_route(&self) -> Result<(), FeedbackError> {
        (**self).notify_off_route()
    }

    fn notify_maneuver_change(&self, instruction: &str) -> Result<(), FeedbackError> {
        (**self).notify_maneuver_change(instruction)
    }
}

/// Feedback due after a fix.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum FeedbackEvent {
    OffRouteHaptic,
    OffRouteNotification,
    ManeuverChanged { instruction: String },
}

impl FeedbackEvent {
    /// Deliver to `sink`, swallowing failures.
    pub fn dispatch<S: FeedbackSink + ?Sized>(&self, sink: &S) {
        let result = match self {
            FeedbackEvent::OffRouteHaptic => sink.off_route_haptic(),
            FeedbackEvent::OffRouteNotification => sink.notify_off_route(),
            FeedbackEvent::ManeuverChanged { instruction } => sink.notify_maneuver_change(instruction),
        };
        if let Err(e) = result {
            debug!("[Feedback] {:?} not delivered: {}", self, e);
        }
    }
}

/// Rate limits for every kind of feedback.
#[derive(Debug, Clone)]
pub struct FeedbackGate {
    haptic: Cooldown,
    notification: Cooldown,
    maneuver: Cooldown,
    maneuver_distance_m: f64,
    last_instruction: Option<String>,
}

impl FeedbackGate {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            haptic: Cooldown::new(config.haptic_cooldown_ms),
            notification: Cooldown::new(config.notification_cooldown_ms),
            maneuver: Cooldown::new(config.maneuver_feedback_cooldown_ms),
            maneuver_distance_m: config.maneuver_feedback_distance_m,
            last_instruction: None,
        }
    }

    /// Feedback for an on-route -> off-route transition.
    pub fn off_route_entered(&mut self, now_ms: u64) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();
        if self.haptic.try_fire(now_ms) {
            events.push(FeedbackEvent::OffRouteHaptic);
        }
        if self.notification.try_fire(now_ms) {
            events.push(FeedbackEvent::OffRouteNotification);
        }
        events
    }

    /// Announce `instruction` when it differs from the last announced one and the maneuver
    /// is close enough. An instruction that could not be announced yet is retried on the
    /// next fix.
    pub fn maneuver(
        &mut self,
        instruction: &str,
        distance_to_maneuver_m: f64,
        now_ms: u64,
    ) -> Option<FeedbackEvent> {
        if self.last_instruction.as_deref() == Some(instruction) {
            return None;
        }
        if !(distance_to_maneuver_m <= self.maneuver_distance_m) {
            return None;
        }
        if !self.maneuver.try_fire(now_ms) {
            return None;
        }

        self.last_instruction = Some(instruction.to_string());
        Some(FeedbackEvent::ManeuverChanged { instruction: instruction.to_string() })
    }

    /// Forget the last announced instruction (new route), keeping the cooldown clocks.
    pub fn forget_instruction(&mut self) {
        self.last_instruction = None;
    }

    pub fn reset(&mut self) {
        self.haptic.reset();
        self.notification.reset();
        self.maneuver.reset();
        self.last_instruction = None;
    }
}
