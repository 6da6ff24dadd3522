//! Dynamic, fixed, before-render and editor passes sharing one event stream

mod common;

use common::*;
use inputflow::health::fixtures::GamepadState;
use inputflow::prelude::*;

fn south(system: &InputSystem, pad: DeviceId, pass: UpdateType) -> ButtonState {
    system.button_state(pad, "buttonSouth", pass).unwrap()
}

fn run(system: &mut InputSystem, pass: UpdateType, events: &mut InputEventBuffer, now: f64) {
    system.update(pass, events, now);
}

#[test]
fn test_event_handled_by_fixed_reaches_dynamic_next_tick() {
    let (mut system, pad) = gameplay_system(InputSettings::default());
    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, 0.1, buttons(GamepadState::SOUTH));

    run(&mut system, UpdateType::Fixed, &mut events, 0.1);
    assert_eq!(events.handled_count(), 1);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::JustPressed);
    // Dynamic has not ticked since the event arrived
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::Released);
    assert_eq!(
        system
            .read_control(pad, "buttonSouth", UpdateType::Dynamic)
            .unwrap(),
        ControlValue::Float(0.0)
    );

    run(&mut system, UpdateType::Dynamic, &mut events, 0.11);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::JustPressed);
    assert_eq!(
        system
            .read_control(pad, "buttonSouth", UpdateType::Dynamic)
            .unwrap(),
        ControlValue::Float(1.0)
    );

    run(&mut system, UpdateType::Dynamic, &mut events, 0.12);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::Pressed);
    run(&mut system, UpdateType::Fixed, &mut events, 0.12);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::Pressed);

    // The action fired once, in the pass that handled the event
    assert_eq!(
        phases_of(&system, "Jump"),
        phases(&[("performed", 0.1), ("waiting", 0.1)])
    );
}

#[test]
fn test_fixed_sees_press_once_after_several_dynamic_ticks() {
    let (mut system, pad) = gameplay_system(InputSettings::default());
    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, 0.01, buttons(GamepadState::SOUTH));

    run(&mut system, UpdateType::Dynamic, &mut events, 0.01);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::JustPressed);
    run(&mut system, UpdateType::Dynamic, &mut events, 0.02);
    run(&mut system, UpdateType::Dynamic, &mut events, 0.03);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::Pressed);

    run(&mut system, UpdateType::Fixed, &mut events, 0.03);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::JustPressed);
    run(&mut system, UpdateType::Fixed, &mut events, 0.05);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::Pressed);

    // Release while fixed is idle
    events.clear();
    push_pad(&mut events, pad, 0.06, buttons(0));
    run(&mut system, UpdateType::Dynamic, &mut events, 0.06);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::JustReleased);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::Pressed);
    run(&mut system, UpdateType::Fixed, &mut events, 0.07);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::JustReleased);
}

#[test]
fn test_events_between_fixed_ticks_accumulate() {
    let (mut system, pad) = gameplay_system(InputSettings::default());
    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, 0.01, buttons(GamepadState::SOUTH));
    run(&mut system, UpdateType::Dynamic, &mut events, 0.01);

    events.clear();
    push_pad(
        &mut events,
        pad,
        0.02,
        buttons(GamepadState::SOUTH | GamepadState::EAST),
    );
    run(&mut system, UpdateType::Dynamic, &mut events, 0.02);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::Pressed);
    assert_eq!(
        system
            .button_state(pad, "buttonEast", UpdateType::Dynamic)
            .unwrap(),
        ButtonState::JustPressed
    );

    // One fixed tick observes both presses against the state before either
    run(&mut system, UpdateType::Fixed, &mut events, 0.02);
    assert_eq!(south(&system, pad, UpdateType::Fixed), ButtonState::JustPressed);
    assert_eq!(
        system
            .button_state(pad, "buttonEast", UpdateType::Fixed)
            .unwrap(),
        ButtonState::JustPressed
    );
}

#[test]
fn test_frame_driver_reports_each_press_once_per_pass() {
    let (mut system, pad) = gameplay_system(InputSettings::default());
    let mut driver = FrameDriver::new();
    let mut events = InputEventBuffer::new();
    let mut seen: Vec<(UpdateType, ButtonState)> = Vec::new();

    push_pad(&mut events, pad, 0.001, buttons(GamepadState::SOUTH));
    let report = driver.advance(&mut system, &mut events, 0.05);
    assert_eq!(report.fixed_steps, 2);
    seen.push((UpdateType::Fixed, south(&system, pad, UpdateType::Fixed)));
    seen.push((UpdateType::Dynamic, south(&system, pad, UpdateType::Dynamic)));
    assert!(events.is_empty());

    for _ in 0..3 {
        driver.advance(&mut system, &mut events, 0.05);
        seen.push((UpdateType::Fixed, south(&system, pad, UpdateType::Fixed)));
        seen.push((UpdateType::Dynamic, south(&system, pad, UpdateType::Dynamic)));
    }

    // The first fixed step handled the event; the second already saw it held
    assert_eq!(seen[0], (UpdateType::Fixed, ButtonState::Pressed));
    assert_eq!(seen[1], (UpdateType::Dynamic, ButtonState::JustPressed));
    assert!(seen[2..].iter().all(|(_, state)| *state == ButtonState::Pressed));
    assert_eq!(
        phases_of(&system, "Jump"),
        phases(&[("performed", 0.001), ("waiting", 0.001)])
    );
}

#[test]
fn test_editor_pass_writes_only_editor_buffers() {
    let mut settings = InputSettings::default();
    settings.update_passes = vec![UpdateType::Dynamic, UpdateType::Fixed, UpdateType::Editor];
    let (mut system, pad) = gameplay_system(settings);

    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, 0.1, buttons(GamepadState::SOUTH));
    run(&mut system, UpdateType::Editor, &mut events, 0.1);

    assert_eq!(south(&system, pad, UpdateType::Editor), ButtonState::JustPressed);
    assert_eq!(
        system
            .read_control(pad, "buttonSouth", UpdateType::Dynamic)
            .unwrap(),
        ControlValue::Float(0.0)
    );
    run(&mut system, UpdateType::Dynamic, &mut events, 0.11);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::Released);

    // Editor buffers flip per event, so a held button reads as pressed
    events.clear();
    push_pad(
        &mut events,
        pad,
        0.2,
        buttons(GamepadState::SOUTH).with_trigger(0.5),
    );
    run(&mut system, UpdateType::Editor, &mut events, 0.2);
    assert_eq!(south(&system, pad, UpdateType::Editor), ButtonState::Pressed);
}

#[test]
fn test_pass_without_buffers_is_a_no_op() {
    let (mut system, pad) = gameplay_system(InputSettings::default());
    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, 0.1, buttons(GamepadState::SOUTH));

    let stats = system.update(UpdateType::Editor, &mut events, 0.1);
    assert_eq!(stats, UpdateStats::default());
    assert_eq!(system.update_count(UpdateType::Editor), 0);
    assert_eq!(events.handled_count(), 0);
    assert_eq!(south(&system, pad, UpdateType::Editor), ButtonState::Released);
}

#[test]
fn test_fixed_pass_falls_back_to_dynamic_buffers() {
    let mut settings = InputSettings::default();
    settings.update_passes = vec![UpdateType::Dynamic];
    let (mut system, pad) = gameplay_system(settings);
    assert!(!system.buffers().is_allocated(UpdateType::Fixed));

    let mut events = InputEventBuffer::new();
    push_pad(&mut events, pad, 0.1, buttons(GamepadState::SOUTH));
    let stats = system.update(UpdateType::Fixed, &mut events, 0.1);
    assert_eq!(stats.events_processed, 1);

    // Written for the next dynamic tick
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::Released);
    run(&mut system, UpdateType::Dynamic, &mut events, 0.11);
    assert_eq!(south(&system, pad, UpdateType::Dynamic), ButtonState::JustPressed);
    assert_eq!(
        phases_of(&system, "Jump"),
        phases(&[("performed", 0.1), ("waiting", 0.1)])
    );
}
