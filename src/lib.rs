//! Inputflow
//!
//! Device-agnostic input: raw timestamped device events go in, per-pass
//! device state and semantic action phases come out.
//!
//! ```no_run
//! use inputflow::prelude::*;
//! use inputflow::health::fixtures::{self, GAMEPAD_FORMAT, GamepadState};
//!
//! let mut system = InputSystem::new(InputSettings::load_or_default("release"));
//! let pad = system.add_device(fixtures::gamepad("pad1"));
//! system.add_action_map(fixtures::gameplay_map())?;
//! system.enable_map("gameplay")?;
//!
//! let mut events = InputEventBuffer::new();
//! let south = GamepadState::with_buttons(GamepadState::SOUTH);
//! events.push_state(pad, 0.1, GAMEPAD_FORMAT, south.as_bytes());
//! system.update(UpdateType::Dynamic, &mut events, 0.1);
//! # Ok::<(), inputflow::error::InputError>(())
//! ```

/// Action maps, binding resolution, interactions and the action state machine
pub mod actions;

/// Input settings and profile loading
pub mod config;

/// Devices, control layouts and control paths
pub mod device;

/// Fixed-timestep driver running update passes per frame
pub mod driver;

/// Error types
pub mod error;

/// Raw event records and the event buffer
pub mod events;

/// Health checks for validating an input setup
pub mod health;

/// Notification callbacks
pub mod listener;

/// Change detection over device state memory
pub mod monitor;

/// Double-buffered per-pass device state
pub mod state;

/// The input system and its event loop
pub mod system;

/// Commonly used types
pub mod prelude {
    pub use crate::actions::{ActionMap, ActionPhase, BindingDescriptor};
    pub use crate::config::InputSettings;
    pub use crate::device::{ControlTree, ControlValue, Device, DeviceId, FourCc};
    pub use crate::driver::FrameDriver;
    pub use crate::error::{InputError, Result};
    pub use crate::events::InputEventBuffer;
    pub use crate::listener::{DeviceChange, EventLog, InputListener};
    pub use crate::state::{ButtonState, UpdateType};
    pub use crate::system::{InputSystem, UpdateStats};
}
