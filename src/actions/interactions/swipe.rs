use glam::Vec2;

use super::{Interaction, InteractionContext, duration};
use crate::actions::NameAndParameters;
use crate::config::InputSettings;
use crate::error::Result;

/// Performs when a vector control moves `distance` away from where it was
/// first actuated
#[derive(Debug)]
pub struct SwipeInteraction {
    distance: f32,
    origin: Option<Vec2>,
}

impl SwipeInteraction {
    pub fn new(distance: f32) -> Self {
        Self {
            distance,
            origin: None,
        }
    }

    pub fn create(
        params: &NameAndParameters,
        settings: &InputSettings,
    ) -> Result<Box<dyn Interaction>> {
        params.expect_only(&["distance"])?;
        Ok(Box::new(Self::new(duration(
            params,
            "distance",
            settings.default_swipe_distance,
        )?)))
    }
}

impl Interaction for SwipeInteraction {
    fn name(&self) -> &'static str {
        "swipe"
    }

    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        let position = ctx.value().as_vec2();
        if ctx.is_waiting() {
            if ctx.control_is_actuated(0.0) {
                self.origin = Some(position);
                ctx.started();
            }
            return;
        }

        if !ctx.control_is_actuated(0.0) {
            self.origin = None;
            ctx.cancelled();
        } else if let Some(origin) = self.origin
            && origin.distance(position) >= self.distance
        {
            self.origin = None;
            ctx.performed_and_go_back_to_waiting();
        }
    }

    fn reset(&mut self) {
        self.origin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionPhase;
    use crate::actions::interactions::PhaseRequest;
    use crate::device::ControlValue;

    fn step(
        swipe: &mut SwipeInteraction,
        settings: &InputSettings,
        phase: ActionPhase,
        position: Vec2,
    ) -> Vec<PhaseRequest> {
        let value = ControlValue::Vector2(position);
        let mut ctx =
            InteractionContext::new(settings, phase, 0.0).with_value(value, value.magnitude());
        swipe.process(&mut ctx);
        ctx.into_requests()
    }

    #[test]
    fn test_swipe_performs_after_distance() {
        let settings = InputSettings::default();
        let mut swipe = SwipeInteraction::new(0.5);
        assert_eq!(
            step(&mut swipe, &settings, ActionPhase::Waiting, Vec2::new(0.1, 0.0)),
            vec![PhaseRequest::Started]
        );
        assert!(step(&mut swipe, &settings, ActionPhase::Started, Vec2::new(0.3, 0.0)).is_empty());
        assert_eq!(
            step(&mut swipe, &settings, ActionPhase::Started, Vec2::new(0.7, 0.0)),
            vec![PhaseRequest::Performed {
                then: ActionPhase::Waiting
            }]
        );
    }

    #[test]
    fn test_swipe_cancels_on_release() {
        let settings = InputSettings::default();
        let mut swipe = SwipeInteraction::new(0.5);
        step(&mut swipe, &settings, ActionPhase::Waiting, Vec2::new(0.1, 0.0));
        assert_eq!(
            step(&mut swipe, &settings, ActionPhase::Started, Vec2::ZERO),
            vec![PhaseRequest::Cancelled]
        );
    }
}
