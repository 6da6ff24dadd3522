//! End-to-end event pipeline health check

use crate::actions::ActionPhase;
use crate::config::InputSettings;
use crate::events::InputEventBuffer;
use crate::health::check::{CheckResult, Findings, SystemCheck};
use crate::health::fixtures::{self, GAMEPAD_FORMAT, GamepadState};
use crate::listener::EventLog;
use crate::state::UpdateType;
use crate::system::InputSystem;

/// Presses buttons on a demo gamepad and watches the resulting actions
pub struct PipelineCheck;

impl PipelineCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PipelineCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for PipelineCheck {
    fn name(&self) -> &'static str {
        "Event Pipeline"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Drives the Jump and Move actions through raw state events")
    }

    fn check(&self, settings: &InputSettings) -> CheckResult {
        let mut findings = Findings::new();
        let mut system = InputSystem::new(settings.clone());
        system.add_listener(Box::new(EventLog::new()));

        let pad = system.add_device(fixtures::gamepad("pad1"));
        let setup = system
            .add_action_map(fixtures::gameplay_map())
            .and_then(|()| system.enable_map("gameplay"));
        if let Err(e) = setup {
            findings.fail(format!("Setup failed: {e}"));
            return findings.finish("");
        }

        let mut events = InputEventBuffer::new();
        events.push_state(
            pad,
            0.1,
            GAMEPAD_FORMAT,
            GamepadState::with_buttons(GamepadState::SOUTH).as_bytes(),
        );
        let stats = system.update(UpdateType::Dynamic, &mut events, 0.1);
        findings.expect(
            stats.events_processed == 1,
            format!("Processed {} event(s)", stats.events_processed),
        );

        let phases = system
            .listener::<EventLog>()
            .map(|log| log.phases())
            .unwrap_or_default();
        let jump: Vec<_> = phases.iter().filter(|(name, _, _)| *name == "Jump").collect();
        findings.expect(
            jump == [&("Jump", "performed", 0.1), &("Jump", "waiting", 0.1)],
            format!("Jump transitions {jump:?}"),
        );

        events.clear();
        let diagonal = GamepadState::with_buttons(GamepadState::DPAD_UP | GamepadState::DPAD_RIGHT);
        events.push_state(pad, 0.2, GAMEPAD_FORMAT, diagonal.as_bytes());
        system.update(UpdateType::Dynamic, &mut events, 0.2);

        match system.action_value("gameplay", "Move", UpdateType::Dynamic) {
            Ok(value) => {
                let v = value.as_vec2();
                findings.expect(
                    (v.x - 0.7071).abs() < 1e-3 && (v.y - 0.7071).abs() < 1e-3,
                    format!("Move reads ({:.3}, {:.3})", v.x, v.y),
                );
            }
            Err(e) => findings.fail(e),
        }
        findings.expect(
            system.action_phase("gameplay", "Move").ok() == Some(ActionPhase::Performed),
            "Move is performed while held",
        );

        findings.finish("Jump and Move behave as expected")
    }
}
