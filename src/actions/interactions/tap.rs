use super::{Interaction, InteractionContext, duration, press_point};
use crate::actions::NameAndParameters;
use crate::config::InputSettings;
use crate::error::Result;

/// Performs when press and release happen within `duration` seconds
#[derive(Debug)]
pub struct TapInteraction {
    duration: f32,
    press_point: f32,
}

impl TapInteraction {
    pub fn new(duration: f32, press_point: f32) -> Self {
        Self {
            duration,
            press_point,
        }
    }

    pub fn create(
        params: &NameAndParameters,
        settings: &InputSettings,
    ) -> Result<Box<dyn Interaction>> {
        params.expect_only(&["duration", "pressPoint"])?;
        Ok(Box::new(Self::new(
            duration(params, "duration", settings.default_tap_time)?,
            press_point(params, settings)?,
        )))
    }
}

impl Interaction for TapInteraction {
    fn name(&self) -> &'static str {
        "tap"
    }

    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        if ctx.timer_has_expired() {
            ctx.cancelled();
            return;
        }

        if ctx.is_waiting() && ctx.control_is_actuated(self.press_point) {
            ctx.started();
            ctx.set_timeout(self.duration);
        } else if ctx.is_started() && !ctx.control_is_actuated(self.press_point) {
            if ctx.time() - ctx.start_time() <= f64::from(self.duration) {
                ctx.performed_and_go_back_to_waiting();
            } else {
                ctx.cancelled();
            }
        }
    }

    fn reset(&mut self) {}
}

/// Performs when a press lasting at least `duration` seconds is released
#[derive(Debug)]
pub struct SlowTapInteraction {
    duration: f32,
    press_point: f32,
}

impl SlowTapInteraction {
    pub fn new(duration: f32, press_point: f32) -> Self {
        Self {
            duration,
            press_point,
        }
    }

    pub fn create(
        params: &NameAndParameters,
        settings: &InputSettings,
    ) -> Result<Box<dyn Interaction>> {
        params.expect_only(&["duration", "pressPoint"])?;
        Ok(Box::new(Self::new(
            duration(params, "duration", settings.default_slow_tap_time)?,
            press_point(params, settings)?,
        )))
    }
}

impl Interaction for SlowTapInteraction {
    fn name(&self) -> &'static str {
        "slowTap"
    }

    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        if ctx.is_waiting() && ctx.control_is_actuated(self.press_point) {
            ctx.started();
        } else if ctx.is_started() && !ctx.control_is_actuated(self.press_point) {
            if ctx.time() - ctx.start_time() >= f64::from(self.duration) {
                ctx.performed_and_go_back_to_waiting();
            } else {
                ctx.cancelled();
            }
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionPhase;
    use crate::actions::interactions::PhaseRequest;
    use crate::device::ControlValue;

    fn release(
        interaction: &mut dyn Interaction,
        settings: &InputSettings,
        start: f64,
        now: f64,
    ) -> Vec<PhaseRequest> {
        let mut ctx =
            InteractionContext::new(settings, ActionPhase::Started, now).with_start_time(start);
        interaction.process(&mut ctx);
        ctx.into_requests()
    }

    #[test]
    fn test_tap_within_duration() {
        let settings = InputSettings::default();
        let mut tap = TapInteraction::new(0.2, 0.5);

        let mut ctx = InteractionContext::new(&settings, ActionPhase::Waiting, 1.0)
            .with_value(ControlValue::Float(1.0), 1.0);
        tap.process(&mut ctx);
        assert_eq!(
            ctx.requests(),
            &[PhaseRequest::Started, PhaseRequest::SetTimeout(0.2)]
        );

        assert_eq!(
            release(&mut tap, &settings, 1.0, 1.1),
            vec![PhaseRequest::Performed {
                then: ActionPhase::Waiting
            }]
        );
        assert_eq!(
            release(&mut tap, &settings, 1.0, 1.5),
            vec![PhaseRequest::Cancelled]
        );
    }

    #[test]
    fn test_tap_timeout_cancels() {
        let settings = InputSettings::default();
        let mut tap = TapInteraction::new(0.2, 0.5);
        let mut ctx = InteractionContext::new(&settings, ActionPhase::Started, 1.2)
            .with_value(ControlValue::Float(1.0), 1.0)
            .with_timer_expired(true);
        tap.process(&mut ctx);
        assert_eq!(ctx.requests(), &[PhaseRequest::Cancelled]);
    }

    #[test]
    fn test_slow_tap_needs_minimum_duration() {
        let settings = InputSettings::default();
        let mut slow = SlowTapInteraction::new(0.5, 0.5);
        assert_eq!(
            release(&mut slow, &settings, 0.0, 0.3),
            vec![PhaseRequest::Cancelled]
        );
        assert_eq!(
            release(&mut slow, &settings, 0.0, 0.7),
            vec![PhaseRequest::Performed {
                then: ActionPhase::Waiting
            }]
        );
    }
}
