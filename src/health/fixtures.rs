//! Demo devices and action maps used by the health checks
//!
//! Also handy for tests and experiments that need a realistic setup without
//! a device backend.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::actions::{ActionMap, BindingDescriptor};
use crate::device::{ControlTree, Device, FourCc};

pub const GAMEPAD_FORMAT: FourCc = FourCc::new(b"GPAD");
pub const KEYBOARD_FORMAT: FourCc = FourCc::new(b"KEYS");

/// Raw state block of the demo gamepad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GamepadState {
    pub buttons: u8,
    pub system: u8,
    pub reserved: [u8; 2],
    pub left_trigger: f32,
    pub left_stick: [f32; 2],
}

impl GamepadState {
    pub const SOUTH: u8 = 1 << 0;
    pub const EAST: u8 = 1 << 1;
    pub const WEST: u8 = 1 << 2;
    pub const NORTH: u8 = 1 << 3;
    pub const DPAD_UP: u8 = 1 << 4;
    pub const DPAD_DOWN: u8 = 1 << 5;
    pub const DPAD_LEFT: u8 = 1 << 6;
    pub const DPAD_RIGHT: u8 = 1 << 7;

    pub fn with_buttons(buttons: u8) -> Self {
        Self {
            buttons,
            ..Self::default()
        }
    }

    pub fn with_stick(mut self, stick: Vec2) -> Self {
        self.left_stick = stick.to_array();
        self
    }

    pub fn with_trigger(mut self, value: f32) -> Self {
        self.left_trigger = value;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Control layout matching [`GamepadState`]
pub fn gamepad_controls() -> ControlTree {
    ControlTree::builder()
        .button("buttonSouth", 0, 0)
        .button("buttonEast", 0, 1)
        .button("buttonWest", 0, 2)
        .button("buttonNorth", 0, 3)
        .button("dpad/up", 0, 4)
        .button("dpad/down", 0, 5)
        .button("dpad/left", 0, 6)
        .button("dpad/right", 0, 7)
        .button("start", 1, 0)
        .button("select", 1, 1)
        .axis("leftTrigger", 4)
        .stick("leftStick", 8)
        .build()
}

pub fn gamepad(name: &str) -> Device {
    Device::new(name, "Gamepad", GAMEPAD_FORMAT, gamepad_controls())
}

/// A keyboard with a handful of keys in one byte
pub fn keyboard(name: &str) -> Device {
    let controls = ControlTree::builder()
        .button("space", 0, 0)
        .button("w", 0, 1)
        .button("a", 0, 2)
        .button("s", 0, 3)
        .button("d", 0, 4)
        .button("leftShift", 0, 5)
        .build();
    Device::new(name, "Keyboard", KEYBOARD_FORMAT, controls)
}

/// Jump, Move, Charge and Sprint over gamepad and keyboard
pub fn gameplay_map() -> ActionMap {
    ActionMap::new("gameplay")
        .with_action("Jump")
        .with_continuous_action("Move")
        .with_action("Charge")
        .with_action("Sprint")
        .with_binding(BindingDescriptor::new("Jump", "<Gamepad>/buttonSouth"))
        .with_binding(BindingDescriptor::new("Jump", "<Keyboard>/space"))
        .with_binding(BindingDescriptor::composite("Move", "2DVector"))
        .with_binding(BindingDescriptor::part("up", "<Gamepad>/dpad/up"))
        .with_binding(BindingDescriptor::part("down", "<Gamepad>/dpad/down"))
        .with_binding(BindingDescriptor::part("left", "<Gamepad>/dpad/left"))
        .with_binding(BindingDescriptor::part("right", "<Gamepad>/dpad/right"))
        .with_binding(
            BindingDescriptor::new("Charge", "<Gamepad>/buttonEast")
                .with_interactions("hold(duration=0.5)"),
        )
        .with_binding(BindingDescriptor::composite("Sprint", "ButtonWithOneModifier"))
        .with_binding(BindingDescriptor::part("modifier", "<Keyboard>/leftShift"))
        .with_binding(BindingDescriptor::part("button", "<Keyboard>/w"))
}
