#![allow(dead_code)]

use inputflow::health::fixtures::{self, GAMEPAD_FORMAT, GamepadState};
use inputflow::prelude::*;

/// A system with one demo gamepad, the gameplay map enabled and an event log
pub fn gameplay_system(settings: InputSettings) -> (InputSystem, DeviceId) {
    let mut system = InputSystem::new(settings);
    system.add_listener(Box::new(EventLog::new()));
    let pad = system.add_device(fixtures::gamepad("pad1"));
    system.add_action_map(fixtures::gameplay_map()).unwrap();
    system.enable_map("gameplay").unwrap();
    (system, pad)
}

/// Queues a full gamepad state event
pub fn push_pad(events: &mut InputEventBuffer, pad: DeviceId, time: f64, state: GamepadState) {
    events.push_state(pad, time, GAMEPAD_FORMAT, state.as_bytes());
}

pub fn buttons(buttons: u8) -> GamepadState {
    GamepadState::with_buttons(buttons)
}

/// Runs one dynamic pass over a fresh buffer holding `state`
pub fn send_pad(system: &mut InputSystem, pad: DeviceId, time: f64, state: GamepadState) -> UpdateStats {
    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, time, state);
    system.update(UpdateType::Dynamic, &mut events, time)
}

/// Runs one dynamic pass with no events
pub fn tick(system: &mut InputSystem, time: f64) -> UpdateStats {
    let mut events = InputEventBuffer::new();
    system.update(UpdateType::Dynamic, &mut events, time)
}

pub fn log(system: &InputSystem) -> &EventLog {
    system.listener::<EventLog>().unwrap()
}

/// Recorded `(phase, time)` pairs of one action
pub fn phases_of(system: &InputSystem, action: &str) -> Vec<(String, f64)> {
    log(system)
        .phases()
        .into_iter()
        .filter(|(name, _, _)| *name == action)
        .map(|(_, phase, time)| (phase.to_string(), time))
        .collect()
}

pub fn phases(list: &[(&str, f64)]) -> Vec<(String, f64)> {
    list.iter().map(|(p, t)| (p.to_string(), *t)).collect()
}
