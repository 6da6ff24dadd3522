use super::{Interaction, InteractionContext, press_point};
use crate::actions::NameAndParameters;
use crate::config::InputSettings;
use crate::error::{InputError, Result};

/// When a press interaction performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressBehavior {
    #[default]
    PressOnly,
    ReleaseOnly,
    PressAndRelease,
}

/// Performs on crossing the press point, the release point, or both
#[derive(Debug)]
pub struct PressInteraction {
    press_point: f32,
    release_point: f32,
    behavior: PressBehavior,
    pressed: bool,
}

impl PressInteraction {
    pub fn new(press_point: f32, release_point: f32, behavior: PressBehavior) -> Self {
        Self {
            press_point,
            release_point,
            behavior,
            pressed: false,
        }
    }

    pub fn create(
        params: &NameAndParameters,
        settings: &InputSettings,
    ) -> Result<Box<dyn Interaction>> {
        params.expect_only(&["pressPoint", "behavior"])?;
        let press_point = press_point(params, settings)?;
        let behavior = match params.get("behavior") {
            None => PressBehavior::PressOnly,
            Some(b) if b.eq_ignore_ascii_case("pressOnly") || b == "0" => PressBehavior::PressOnly,
            Some(b) if b.eq_ignore_ascii_case("releaseOnly") || b == "1" => {
                PressBehavior::ReleaseOnly
            }
            Some(b) if b.eq_ignore_ascii_case("pressAndRelease") || b == "2" => {
                PressBehavior::PressAndRelease
            }
            Some(b) => {
                return Err(InputError::invalid_parameter(
                    &params.name,
                    "behavior",
                    format!("unknown behavior '{b}'"),
                ));
            }
        };
        Ok(Box::new(Self::new(
            press_point,
            press_point * settings.button_release_threshold,
            behavior,
        )))
    }
}

impl Interaction for PressInteraction {
    fn name(&self) -> &'static str {
        "press"
    }

    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        if !self.pressed && ctx.control_is_actuated(self.press_point) {
            self.pressed = true;
            ctx.started();
            match self.behavior {
                PressBehavior::PressOnly => ctx.performed_and_go_back_to_waiting(),
                PressBehavior::PressAndRelease => ctx.performed_and_stay_started(),
                PressBehavior::ReleaseOnly => {}
            }
        } else if self.pressed && !ctx.control_is_actuated(self.release_point) {
            self.pressed = false;
            match self.behavior {
                PressBehavior::PressOnly => {}
                PressBehavior::ReleaseOnly | PressBehavior::PressAndRelease => {
                    ctx.performed_and_go_back_to_waiting()
                }
            }
        }
    }

    fn reset(&mut self) {
        self.pressed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionPhase;
    use crate::actions::interactions::PhaseRequest;
    use crate::device::ControlValue;

    fn step(
        interaction: &mut PressInteraction,
        settings: &InputSettings,
        phase: ActionPhase,
        magnitude: f32,
    ) -> Vec<PhaseRequest> {
        let mut ctx = InteractionContext::new(settings, phase, 0.0)
            .with_value(ControlValue::Float(magnitude), magnitude);
        interaction.process(&mut ctx);
        ctx.into_requests()
    }

    #[test]
    fn test_press_only() {
        let settings = InputSettings::default();
        let mut press = PressInteraction::new(0.5, 0.375, PressBehavior::PressOnly);
        let requests = step(&mut press, &settings, ActionPhase::Waiting, 1.0);
        assert_eq!(
            requests,
            vec![
                PhaseRequest::Started,
                PhaseRequest::Performed {
                    then: ActionPhase::Waiting
                }
            ]
        );
        // Held above the press point: no repeat
        assert!(step(&mut press, &settings, ActionPhase::Waiting, 0.9).is_empty());
        assert!(step(&mut press, &settings, ActionPhase::Waiting, 0.0).is_empty());
    }

    #[test]
    fn test_release_only_uses_release_point() {
        let settings = InputSettings::default();
        let mut press = PressInteraction::new(0.5, 0.375, PressBehavior::ReleaseOnly);
        assert_eq!(
            step(&mut press, &settings, ActionPhase::Waiting, 0.6),
            vec![PhaseRequest::Started]
        );
        // Between release and press point still counts as held
        assert!(step(&mut press, &settings, ActionPhase::Started, 0.4).is_empty());
        assert_eq!(
            step(&mut press, &settings, ActionPhase::Started, 0.1),
            vec![PhaseRequest::Performed {
                then: ActionPhase::Waiting
            }]
        );
    }

    #[test]
    fn test_unknown_behavior() {
        let settings = InputSettings::default();
        let params = NameAndParameters::parse("press(behavior=sometimes)").unwrap();
        assert!(PressInteraction::create(&params, &settings).is_err());
    }
}
