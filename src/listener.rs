//! Synchronous notification callbacks
//!
//! Listeners are called in registration order from inside the mutating call
//! that caused the notification. There is no queuing.

use std::any::Any;

use crate::actions::ActionChange;
use crate::device::{Device, DeviceId};

/// What happened to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceChange {
    Added,
    Removed,
    UsageChanged,
    /// State memory was reset outside of the event stream
    StateChanged,
    ConfigurationChanged,
}

/// A factory was added to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    InteractionRegistered(String),
    CompositeRegistered(String),
}

/// Trait for subsystems that observe the input system
pub trait InputListener {
    /// Name of this listener for debugging
    fn name(&self) -> &str;

    fn on_device_change(&mut self, _device: &Device, _change: DeviceChange) {}

    /// Called once per action phase change, after the pass that caused it
    /// has applied all of its events
    fn on_action_change(&mut self, _change: &ActionChange) {}

    fn on_text_input(&mut self, _device: &Device, _character: char) {}

    fn on_registry_change(&mut self, _change: &RegistryChange) {}

    /// Downcast to concrete type for accessing listener-specific state
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Listener that records everything it is told
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub devices: Vec<(DeviceId, DeviceChange)>,
    pub actions: Vec<ActionChange>,
    pub text: Vec<(DeviceId, char)>,
    pub registry: Vec<RegistryChange>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(action name, phase, time)` of every recorded action change
    pub fn phases(&self) -> Vec<(&str, &'static str, f64)> {
        self.actions
            .iter()
            .map(|c| (c.action_name.as_str(), c.phase.as_str(), c.time))
            .collect()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.actions.clear();
        self.text.clear();
        self.registry.clear();
    }
}

impl InputListener for EventLog {
    fn name(&self) -> &str {
        "event-log"
    }

    fn on_device_change(&mut self, device: &Device, change: DeviceChange) {
        self.devices.push((device.id(), change));
    }

    fn on_action_change(&mut self, change: &ActionChange) {
        self.actions.push(change.clone());
    }

    fn on_text_input(&mut self, device: &Device, character: char) {
        self.text.push((device.id(), character));
    }

    fn on_registry_change(&mut self, change: &RegistryChange) {
        self.registry.push(change.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
