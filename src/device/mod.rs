//! Devices and their control layouts
//!
//! A device is an ordered tree of named controls laid over one contiguous
//! state block. The layout itself is supplied by the caller; this module only
//! records it, reads typed values out of state memory and matches control
//! paths against it.

mod control;
mod path;

use std::fmt;

use bytemuck::{Pod, Zeroable};
use enum_map::EnumMap;

use crate::state::{UpdateType, align_state_size};

pub use control::{
    ControlFormat, ControlNode, ControlTree, ControlTreeBuilder, ControlValue, StateBlock,
};
pub use path::{ControlPath, DeviceMatcher};

/// Stable identifier assigned when a device is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// Placeholder carried by devices that have not been added yet
    pub const INVALID: DeviceId = DeviceId(0);
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Four-character code identifying event kinds and state formats
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct FourCc(pub u32);

impl FourCc {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(u32::from_le_bytes(*code))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.to_bytes() {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

/// Opaque command sent to a device backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub kind: FourCc,
    pub payload: Vec<u8>,
}

impl DeviceCommand {
    pub fn new(kind: FourCc, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Result code returned when a command cannot be executed
pub const COMMAND_UNSUPPORTED: i64 = -1;

/// Backend that executes device-specific commands (rumble, LEDs, calibration)
///
/// Negative return values signal failure or lack of support.
pub trait DeviceRuntime {
    fn execute_command(&mut self, device: DeviceId, command: &mut DeviceCommand) -> i64;
}

/// A connected input device
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    name: String,
    layout: String,
    usages: Vec<String>,
    format: FourCc,
    controls: ControlTree,
    update_before_render: bool,
    text_input: Vec<char>,
    config_generation: u32,
    pub(crate) index: usize,
    pub(crate) state_offset: usize,
    pub(crate) last_update_time: f64,
    /// Update count each pass's buffer was last swapped for
    pub(crate) last_flip: EnumMap<UpdateType, u64>,
}

impl Device {
    /// Creates a device description; the id is assigned when it is added
    pub fn new(
        name: impl Into<String>,
        layout: impl Into<String>,
        format: FourCc,
        controls: ControlTree,
    ) -> Self {
        Self {
            id: DeviceId::INVALID,
            name: name.into(),
            layout: layout.into(),
            usages: Vec::new(),
            format,
            controls,
            update_before_render: false,
            text_input: Vec::new(),
            config_generation: 0,
            index: 0,
            state_offset: 0,
            last_update_time: 0.0,
            last_flip: EnumMap::default(),
        }
    }

    /// Builder method to tag the device with a usage
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usages.push(usage.into());
        self
    }

    /// Builder method to opt into before-render passes
    pub fn with_update_before_render(mut self, enabled: bool) -> Self {
        self.update_before_render = enabled;
        self
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn usages(&self) -> &[String] {
        &self.usages
    }

    pub fn has_usage(&self, usage: &str) -> bool {
        self.usages.iter().any(|u| u.eq_ignore_ascii_case(usage))
    }

    /// State format expected in this device's state events
    pub fn format(&self) -> FourCc {
        self.format
    }

    pub fn controls(&self) -> &ControlTree {
        &self.controls
    }

    /// Position of the device in the device list and state buffers
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of this device's block within a buffer half
    pub fn state_offset(&self) -> usize {
        self.state_offset
    }

    /// Unpadded size of the state block
    pub fn state_size(&self) -> usize {
        self.controls.state_size_in_bytes()
    }

    pub fn aligned_state_size(&self) -> usize {
        align_state_size(self.state_size())
    }

    /// Time stamp of the last applied state event
    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }

    pub fn updates_before_render(&self) -> bool {
        self.update_before_render
    }

    /// Number of configuration-changed events received
    pub fn config_generation(&self) -> u32 {
        self.config_generation
    }

    /// Characters received since the last [`take_text_input`](Self::take_text_input)
    pub fn text_input(&self) -> &[char] {
        &self.text_input
    }

    pub fn take_text_input(&mut self) -> Vec<char> {
        std::mem::take(&mut self.text_input)
    }

    pub(crate) fn set_id(&mut self, id: DeviceId) {
        self.id = id;
    }

    pub(crate) fn add_usage(&mut self, usage: String) -> bool {
        if self.has_usage(&usage) {
            return false;
        }
        self.usages.push(usage);
        true
    }

    pub(crate) fn remove_usage(&mut self, usage: &str) -> bool {
        let before = self.usages.len();
        self.usages.retain(|u| !u.eq_ignore_ascii_case(usage));
        self.usages.len() != before
    }

    pub(crate) fn set_controls(&mut self, controls: ControlTree) {
        self.controls = controls;
    }

    pub(crate) fn set_update_before_render(&mut self, enabled: bool) {
        self.update_before_render = enabled;
    }

    pub(crate) fn push_text(&mut self, c: char) {
        self.text_input.push(c);
    }

    pub(crate) fn bump_config_generation(&mut self) {
        self.config_generation = self.config_generation.wrapping_add(1);
    }
}
