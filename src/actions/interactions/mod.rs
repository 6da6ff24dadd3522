//! Interactions interpret actuation over time and request phase changes
//!
//! An interaction never changes phases itself. It inspects an
//! [`InteractionContext`] and records requests (`started`, `performed_*`,
//! `cancelled`, `set_timeout`) which the state machine applies in order.

mod hold;
mod multi_tap;
mod press;
mod swipe;
mod tap;

use std::fmt;

use super::ActionPhase;
use crate::config::InputSettings;
use crate::device::ControlValue;

pub use hold::HoldInteraction;
pub use multi_tap::MultiTapInteraction;
pub use press::{PressBehavior, PressInteraction};
pub use swipe::SwipeInteraction;
pub use tap::{SlowTapInteraction, TapInteraction};

/// Stateful logic attached to a binding
pub trait Interaction: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Called on every value change of a bound control and when a timeout
    /// set by this interaction expires
    fn process(&mut self, ctx: &mut InteractionContext<'_>);

    /// Clears internal state after a cancel or when the owning map is reset
    fn reset(&mut self);
}

/// A phase change requested by an interaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseRequest {
    Started,
    /// Performed, then continue in `then`
    Performed { then: ActionPhase },
    Cancelled,
    SetTimeout(f32),
}

/// What an interaction sees while processing one change or timeout
#[derive(Debug)]
pub struct InteractionContext<'a> {
    settings: &'a InputSettings,
    phase: ActionPhase,
    time: f64,
    start_time: f64,
    timer_expired: bool,
    value: ControlValue,
    magnitude: f32,
    continuous: bool,
    requests: Vec<PhaseRequest>,
}

impl<'a> InteractionContext<'a> {
    pub fn new(settings: &'a InputSettings, phase: ActionPhase, time: f64) -> Self {
        Self {
            settings,
            phase,
            time,
            start_time: 0.0,
            timer_expired: false,
            value: ControlValue::default(),
            magnitude: 0.0,
            continuous: false,
            requests: Vec::new(),
        }
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Current value of the bound control or composite and its actuation
    pub fn with_value(mut self, value: ControlValue, magnitude: f32) -> Self {
        self.value = value;
        self.magnitude = magnitude;
        self
    }

    pub fn with_timer_expired(mut self, expired: bool) -> Self {
        self.timer_expired = expired;
        self
    }

    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Phase of the interaction, updated as requests are made
    pub fn phase(&self) -> ActionPhase {
        self.phase
    }

    pub fn is_waiting(&self) -> bool {
        self.phase == ActionPhase::Waiting
    }

    pub fn is_started(&self) -> bool {
        self.phase == ActionPhase::Started
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time of the last `started` request
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn timer_has_expired(&self) -> bool {
        self.timer_expired
    }

    pub fn value(&self) -> ControlValue {
        self.value
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn continuous(&self) -> bool {
        self.continuous
    }

    pub fn settings(&self) -> &InputSettings {
        self.settings
    }

    /// A threshold of zero means any actuation counts
    pub fn control_is_actuated(&self, threshold: f32) -> bool {
        if threshold <= 0.0 {
            self.magnitude > 0.0
        } else {
            self.magnitude >= threshold
        }
    }

    pub fn started(&mut self) {
        self.requests.push(PhaseRequest::Started);
        self.phase = ActionPhase::Started;
        self.start_time = self.time;
    }

    pub fn performed_and_go_back_to_waiting(&mut self) {
        self.performed(ActionPhase::Waiting);
    }

    pub fn performed_and_stay_started(&mut self) {
        self.performed(ActionPhase::Started);
    }

    pub fn performed_and_stay_performed(&mut self) {
        self.performed(ActionPhase::Performed);
    }

    fn performed(&mut self, then: ActionPhase) {
        self.requests.push(PhaseRequest::Performed { then });
        self.phase = then;
    }

    pub fn cancelled(&mut self) {
        self.requests.push(PhaseRequest::Cancelled);
        self.phase = ActionPhase::Waiting;
    }

    /// Schedules a callback with `timer_has_expired` set after `seconds`
    pub fn set_timeout(&mut self, seconds: f32) {
        self.requests.push(PhaseRequest::SetTimeout(seconds));
    }

    pub fn requests(&self) -> &[PhaseRequest] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<PhaseRequest> {
        self.requests
    }
}

/// Reads an optional `pressPoint` parameter, falling back to the default
fn press_point(
    params: &super::NameAndParameters,
    settings: &InputSettings,
) -> crate::error::Result<f32> {
    Ok(params
        .f32("pressPoint")?
        .filter(|p| *p > 0.0)
        .unwrap_or(settings.default_button_press_point))
}

/// Reads an optional positive duration parameter
fn duration(
    params: &super::NameAndParameters,
    name: &str,
    default: f32,
) -> crate::error::Result<f32> {
    Ok(params.f32(name)?.filter(|d| *d > 0.0).unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuation_threshold() {
        let settings = InputSettings::default();
        let ctx = InteractionContext::new(&settings, ActionPhase::Waiting, 0.0)
            .with_value(ControlValue::Float(0.5), 0.5);
        assert!(ctx.control_is_actuated(0.0));
        assert!(ctx.control_is_actuated(0.5));
        assert!(!ctx.control_is_actuated(0.6));

        let idle = InteractionContext::new(&settings, ActionPhase::Waiting, 0.0);
        assert!(!idle.control_is_actuated(0.0));
    }

    #[test]
    fn test_requests_track_phase() {
        let settings = InputSettings::default();
        let mut ctx = InteractionContext::new(&settings, ActionPhase::Waiting, 2.0);
        ctx.started();
        assert!(ctx.is_started());
        assert_eq!(ctx.start_time(), 2.0);
        ctx.performed_and_stay_performed();
        assert_eq!(ctx.phase(), ActionPhase::Performed);
        ctx.cancelled();
        assert!(ctx.is_waiting());
        assert_eq!(
            ctx.requests(),
            &[
                PhaseRequest::Started,
                PhaseRequest::Performed {
                    then: ActionPhase::Performed
                },
                PhaseRequest::Cancelled,
            ]
        );
    }
}
