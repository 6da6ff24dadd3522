use super::{Interaction, InteractionContext, duration, press_point};
use crate::actions::NameAndParameters;
use crate::config::InputSettings;
use crate::error::Result;

/// Performs once the control has stayed actuated for `duration` seconds
#[derive(Debug)]
pub struct HoldInteraction {
    duration: f32,
    press_point: f32,
}

impl HoldInteraction {
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
            duration(params, "duration", settings.default_hold_time)?,
            press_point(params, settings)?,
        )))
    }
}

impl Interaction for HoldInteraction {
    fn name(&self) -> &'static str {
        "hold"
    }

    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        if ctx.timer_has_expired() {
            ctx.performed_and_go_back_to_waiting();
            return;
        }

        if ctx.is_waiting() && ctx.control_is_actuated(self.press_point) {
            ctx.started();
            ctx.set_timeout(self.duration);
        } else if ctx.is_started() && !ctx.control_is_actuated(self.press_point) {
            ctx.cancelled();
        }
    }

    fn reset(&mut self) {}
}
