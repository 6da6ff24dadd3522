use super::{Interaction, InteractionContext, duration, press_point};
use crate::actions::NameAndParameters;
use crate::config::InputSettings;
use crate::error::{InputError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TapPhase {
    #[default]
    None,
    WaitingForNextRelease,
    WaitingForNextPress,
}

/// Performs after `tap_count` taps with at most `tap_delay` seconds between them
#[derive(Debug)]
pub struct MultiTapInteraction {
    tap_count: u32,
    tap_time: f32,
    tap_delay: f32,
    press_point: f32,
    tap_phase: TapPhase,
    current_tap_count: u32,
    current_tap_start: f64,
    last_tap_release: f64,
}

impl MultiTapInteraction {
    pub fn new(tap_count: u32, tap_time: f32, tap_delay: f32, press_point: f32) -> Self {
        Self {
            tap_count,
            tap_time,
            tap_delay,
            press_point,
            tap_phase: TapPhase::None,
            current_tap_count: 0,
            current_tap_start: 0.0,
            last_tap_release: 0.0,
        }
    }

    pub fn create(
        params: &NameAndParameters,
        settings: &InputSettings,
    ) -> Result<Box<dyn Interaction>> {
        params.expect_only(&["tapCount", "tapTime", "tapDelay", "pressPoint"])?;
        let tap_count = params.u32("tapCount")?.unwrap_or(2);
        if tap_count == 0 {
            return Err(InputError::invalid_parameter(
                &params.name,
                "tapCount",
                "must be at least 1",
            ));
        }
        Ok(Box::new(Self::new(
            tap_count,
            duration(params, "tapTime", settings.default_tap_time)?,
            duration(params, "tapDelay", settings.multi_tap_delay_time)?,
            press_point(params, settings)?,
        )))
    }

    fn begin_tap(&mut self, ctx: &mut InteractionContext<'_>) {
        self.tap_phase = TapPhase::WaitingForNextRelease;
        self.current_tap_start = ctx.time();
        ctx.set_timeout(self.tap_time);
    }
}

impl Interaction for MultiTapInteraction {
    fn name(&self) -> &'static str {
        "multiTap"
    }

    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        if ctx.timer_has_expired() {
            ctx.cancelled();
            return;
        }

        let actuated = ctx.control_is_actuated(self.press_point);
        match self.tap_phase {
            TapPhase::None => {
                if actuated {
                    ctx.started();
                    self.begin_tap(ctx);
                }
            }
            TapPhase::WaitingForNextRelease => {
                if actuated {
                    return;
                }
                if ctx.time() - self.current_tap_start > f64::from(self.tap_time) {
                    ctx.cancelled();
                    return;
                }
                self.current_tap_count += 1;
                if self.current_tap_count >= self.tap_count {
                    ctx.performed_and_go_back_to_waiting();
                    self.reset();
                } else {
                    self.tap_phase = TapPhase::WaitingForNextPress;
                    self.last_tap_release = ctx.time();
                    ctx.set_timeout(self.tap_delay);
                }
            }
            TapPhase::WaitingForNextPress => {
                if !actuated {
                    return;
                }
                if ctx.time() - self.last_tap_release <= f64::from(self.tap_delay) {
                    self.begin_tap(ctx);
                } else {
                    ctx.cancelled();
                }
            }
        }
    }

    fn reset(&mut self) {
        self.tap_phase = TapPhase::None;
        self.current_tap_count = 0;
        self.current_tap_start = 0.0;
        self.last_tap_release = 0.0;
    }
}
