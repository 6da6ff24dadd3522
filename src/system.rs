//! The input system
//!
//! Owns devices, their state buffers, the change monitors, the registered
//! action maps and the action state machine, and runs the per-pass event
//! loop that ties them together.
//!
//! # Event loop
//!
//! For every unhandled record of the event buffer, in arrival order:
//!
//! 1. Before-render passes skip devices that did not opt in
//! 2. State events older than the device's last update are dropped
//! 3. State events in a foreign format are dropped
//! 4. The payload is clamped to the device's state block and scanned by the
//!    change monitors against the front buffer the pass observes
//! 5. Buffers are flipped for their tick, carried forward and written
//! 6. Signalled monitors are dispatched to the action state machine
//!
//! Removal, text and configuration-change records bypass the state buffers.
//! Every record a pass looked at is flagged as handled, so later passes fed
//! the same buffer skip it; they see its effect through the buffers it was
//! written into.

use enum_map::EnumMap;
use tracing::{debug, error, info, trace, warn};

use crate::actions::{
    ActionMap, ActionPhase, ActionState, ActionStateMachine, BindingResolver, CompositeFactory,
    ControlReader, InputRegistry, InteractionFactory, ResolvedControl,
};
use crate::config::InputSettings;
use crate::device::{
    COMMAND_UNSUPPORTED, ControlTree, ControlValue, Device, DeviceCommand, DeviceId,
    DeviceRuntime, StateBlock,
};
use crate::error::{InputError, Result};
use crate::events::{
    DELTA_STATE_EVENT, DEVICE_CONFIG_CHANGED_EVENT, DEVICE_REMOVED_EVENT, EventRef,
    InputEventBuffer, STATE_EVENT, TEXT_EVENT,
};
use crate::listener::{DeviceChange, InputListener, RegistryChange};
use crate::monitor::{ChangeMonitorEngine, MonitorListener, MonitorRegion};
use crate::state::{ButtonState, StateBuffers, StateView, UpdateType};

/// Counters describing one update pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateStats {
    pub events_processed: usize,
    pub stale_dropped: usize,
    pub format_mismatches: usize,
    pub unknown_device: usize,
    pub truncated: usize,
    pub monitors_signalled: usize,
    pub timeouts_fired: usize,
    pub continuous_fired: usize,
    /// Action changes delivered to listeners
    pub notifications: usize,
}

#[derive(Debug)]
struct MapEntry {
    map: ActionMap,
    enabled: bool,
    /// Message of the last resolution failure
    error: Option<String>,
}

/// Reads controls out of the front buffer of one pass
struct BufferReader<'a> {
    buffers: &'a StateBuffers,
    pass: Option<UpdateType>,
}

impl ControlReader for BufferReader<'_> {
    fn read(&self, control: &ResolvedControl) -> ControlValue {
        self.pass
            .and_then(|pass| self.buffers.front(pass, control.device_index))
            .map(|view| control.block.read(view))
            .unwrap_or_default()
    }
}

/// Buffers written by one event, and whether each was flipped for it
type WriteTargets = EnumMap<UpdateType, Option<bool>>;

/// Device state, action maps and their runtime state
pub struct InputSystem {
    settings: InputSettings,
    registry: InputRegistry,
    devices: Vec<Device>,
    next_device_id: u32,
    buffers: StateBuffers,
    monitors: ChangeMonitorEngine,
    maps: Vec<MapEntry>,
    actions: ActionStateMachine,
    update_counts: EnumMap<UpdateType, u64>,
    listeners: Vec<Box<dyn InputListener>>,
    runtime: Option<Box<dyn DeviceRuntime>>,
    signals: Vec<MonitorListener>,
}

impl InputSystem {
    /// Creates a system with the built-in interactions and composites
    pub fn new(settings: InputSettings) -> Self {
        Self::with_registry(settings, InputRegistry::with_defaults())
    }

    pub fn with_registry(settings: InputSettings, registry: InputRegistry) -> Self {
        let mut buffers = StateBuffers::new();
        if let Err(e) = buffers.allocate_all(settings.update_mask(), &[]) {
            abort_on_capacity(&e);
        }
        info!(
            profile = %settings.profile,
            passes = ?settings.update_passes,
            "Input system created"
        );
        Self {
            settings,
            registry,
            devices: Vec::new(),
            next_device_id: 0,
            buffers,
            monitors: ChangeMonitorEngine::new(),
            maps: Vec::new(),
            actions: ActionStateMachine::default(),
            update_counts: EnumMap::default(),
            listeners: Vec::new(),
            runtime: None,
            signals: Vec::new(),
        }
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    pub fn registry(&self) -> &InputRegistry {
        &self.registry
    }

    pub fn buffers(&self) -> &StateBuffers {
        &self.buffers
    }

    pub fn monitors(&self) -> &ChangeMonitorEngine {
        &self.monitors
    }

    pub fn actions(&self) -> &ActionStateMachine {
        &self.actions
    }

    /// Number of updates run so far for `pass`
    pub fn update_count(&self, pass: UpdateType) -> u64 {
        self.update_counts[pass]
    }

    // ------------------------------------------------------------------
    // Listeners and backend
    // ------------------------------------------------------------------

    pub fn add_listener(&mut self, listener: Box<dyn InputListener>) {
        debug!(name = listener.name(), "Registering listener");
        self.listeners.push(listener);
    }

    /// First listener of type `T`
    pub fn listener<T: 'static>(&self) -> Option<&T> {
        self.listeners
            .iter()
            .find_map(|l| l.as_any().downcast_ref::<T>())
    }

    pub fn listener_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.listeners
            .iter_mut()
            .find_map(|l| l.as_any_mut().downcast_mut::<T>())
    }

    pub fn set_runtime(&mut self, runtime: Box<dyn DeviceRuntime>) {
        self.runtime = Some(runtime);
    }

    /// Forwards a command to the device backend
    ///
    /// Returns [`COMMAND_UNSUPPORTED`] for unknown devices or when no backend
    /// is installed.
    pub fn execute_device_command(&mut self, device: DeviceId, command: &mut DeviceCommand) -> i64 {
        if self.device_index(device).is_none() {
            debug!(%device, kind = %command.kind, "Command for unknown device");
            return COMMAND_UNSUPPORTED;
        }
        match self.runtime.as_mut() {
            Some(runtime) => runtime.execute_command(device, command),
            None => COMMAND_UNSUPPORTED,
        }
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Adds or replaces an interaction type and re-resolves all maps
    pub fn register_interaction(&mut self, name: &str, factory: InteractionFactory) {
        self.registry.register_interaction(name, factory);
        let change = RegistryChange::InteractionRegistered(name.to_string());
        for listener in &mut self.listeners {
            listener.on_registry_change(&change);
        }
        self.resolve();
    }

    /// Adds or replaces a composite type and re-resolves all maps
    pub fn register_composite(&mut self, name: &str, factory: CompositeFactory) {
        self.registry.register_composite(name, factory);
        let change = RegistryChange::CompositeRegistered(name.to_string());
        for listener in &mut self.listeners {
            listener.on_registry_change(&change);
        }
        self.resolve();
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id() == id)
    }

    fn device_index(&self, id: DeviceId) -> Option<usize> {
        self.devices.iter().position(|d| d.id() == id)
    }

    fn require_device(&self, id: DeviceId) -> Result<usize> {
        self.device_index(id).ok_or(InputError::UnknownDevice(id))
    }

    /// Adds a device, assigning its id and state memory
    pub fn add_device(&mut self, mut device: Device) -> DeviceId {
        self.next_device_id += 1;
        let id = DeviceId(self.next_device_id);
        device.set_id(id);
        device.last_flip = EnumMap::default();

        let mut old_indices: Vec<Option<usize>> = (0..self.devices.len()).map(Some).collect();
        old_indices.push(None);
        self.devices.push(device);
        self.reallocate(&old_indices);

        let index = self.devices.len() - 1;
        let device = &self.devices[index];
        info!(
            device = %id,
            name = device.name(),
            layout = device.layout(),
            state_size = device.state_size(),
            "Device added"
        );
        self.resolve();
        self.notify_device(index, DeviceChange::Added);
        id
    }

    /// Removes a device and frees its state memory
    pub fn remove_device(&mut self, id: DeviceId) -> Result<Device> {
        let index = self.require_device(id)?;
        Ok(self.remove_device_at(index))
    }

    fn remove_device_at(&mut self, index: usize) -> Device {
        self.monitors.remove_device(index);
        self.buffers.zero_device(index);
        let removed = self.devices.remove(index);

        let old_indices: Vec<Option<usize>> = (0..self.devices.len())
            .map(|i| Some(if i < index { i } else { i + 1 }))
            .collect();
        self.reallocate(&old_indices);
        info!(device = %removed.id(), name = removed.name(), "Device removed");

        self.resolve();
        for listener in &mut self.listeners {
            listener.on_device_change(&removed, DeviceChange::Removed);
        }
        removed
    }

    pub fn add_device_usage(&mut self, id: DeviceId, usage: &str) -> Result<()> {
        let index = self.require_device(id)?;
        if self.devices[index].add_usage(usage.to_string()) {
            debug!(device = %id, usage, "Usage added");
            self.resolve();
            self.notify_device(index, DeviceChange::UsageChanged);
        }
        Ok(())
    }

    pub fn remove_device_usage(&mut self, id: DeviceId, usage: &str) -> Result<()> {
        let index = self.require_device(id)?;
        if self.devices[index].remove_usage(usage) {
            debug!(device = %id, usage, "Usage removed");
            self.resolve();
            self.notify_device(index, DeviceChange::UsageChanged);
        }
        Ok(())
    }

    /// Replaces a device's control layout; its state memory is resized
    pub fn set_device_controls(&mut self, id: DeviceId, controls: ControlTree) -> Result<()> {
        let index = self.require_device(id)?;
        self.devices[index].set_controls(controls);
        let old_indices: Vec<Option<usize>> = (0..self.devices.len()).map(Some).collect();
        self.reallocate(&old_indices);
        info!(device = %id, controls = self.devices[index].controls().len(), "Device layout changed");
        self.resolve();
        self.notify_device(index, DeviceChange::ConfigurationChanged);
        Ok(())
    }

    pub fn set_update_before_render(&mut self, id: DeviceId, enabled: bool) -> Result<()> {
        let index = self.require_device(id)?;
        self.devices[index].set_update_before_render(enabled);
        Ok(())
    }

    /// Zeroes every buffer of a device
    pub fn reset_device(&mut self, id: DeviceId) -> Result<()> {
        let index = self.require_device(id)?;
        self.buffers.zero_device(index);
        debug!(device = %id, "Device state reset");
        self.notify_device(index, DeviceChange::StateChanged);
        Ok(())
    }

    /// Drains the characters received by a device
    pub fn take_text_input(&mut self, id: DeviceId) -> Result<Vec<char>> {
        let index = self.require_device(id)?;
        Ok(self.devices[index].take_text_input())
    }

    fn notify_device(&mut self, index: usize, change: DeviceChange) {
        let device = &self.devices[index];
        for listener in &mut self.listeners {
            listener.on_device_change(device, change);
        }
    }

    /// Rebuilds state memory for the current device list
    ///
    /// `old_indices[i]` names the previous index of device `i`, if any.
    fn reallocate(&mut self, old_indices: &[Option<usize>]) {
        let sizes: Vec<usize> = self.devices.iter().map(Device::state_size).collect();
        let mut fresh = StateBuffers::new();
        let offsets = match fresh.allocate_all(self.settings.update_mask(), &sizes) {
            Ok(offsets) => offsets,
            Err(e) => abort_on_capacity(&e),
        };
        fresh.migrate_all(&self.buffers, old_indices);

        let mut old = std::mem::replace(&mut self.buffers, fresh);
        old.free_all();

        for (index, (device, offset)) in self.devices.iter_mut().zip(offsets).enumerate() {
            device.index = index;
            device.state_offset = offset;
        }
        debug!(
            devices = self.devices.len(),
            bytes = self.buffers.total_size(),
            "Reallocated state buffers"
        );
    }

    // ------------------------------------------------------------------
    // Action maps
    // ------------------------------------------------------------------

    /// Registers an action map, replacing one with the same name
    ///
    /// The map starts disabled. A resolution error is returned after the map
    /// has been stored; the map stays unusable until its bindings are fixed.
    pub fn add_action_map(&mut self, map: ActionMap) -> Result<()> {
        let index = match self.map_index(map.name()) {
            Ok(index) => {
                self.maps[index].map = map;
                index
            }
            Err(_) => {
                self.maps.push(MapEntry {
                    map,
                    enabled: false,
                    error: None,
                });
                self.maps.len() - 1
            }
        };
        self.resolve_reporting(index)
    }

    pub fn action_map(&self, name: &str) -> Option<&ActionMap> {
        self.map_index(name).ok().map(|i| &self.maps[i].map)
    }

    /// Message of the last resolution failure of a map
    pub fn map_error(&self, name: &str) -> Option<&str> {
        let index = self.map_index(name).ok()?;
        self.maps[index].error.as_deref()
    }

    /// Configuration problems met by the last resolution
    pub fn warnings(&self) -> &[InputError] {
        &self.actions.tables().warnings
    }

    fn map_index(&self, name: &str) -> Result<usize> {
        self.maps
            .iter()
            .position(|m| m.map.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| InputError::UnknownActionMap(name.to_string()))
    }

    pub fn is_map_enabled(&self, name: &str) -> bool {
        self.map_index(name).is_ok_and(|i| self.maps[i].enabled)
    }

    /// Starts monitoring the map's controls
    pub fn enable_map(&mut self, name: &str) -> Result<()> {
        let index = self.map_index(name)?;
        if self.maps[index].enabled {
            return Ok(());
        }
        self.maps[index].enabled = true;
        self.register_map_monitors(index);
        self.actions.set_map_enabled(index, true);
        info!(map = name, "Action map enabled");
        Ok(())
    }

    /// Stops monitoring the map's controls and returns its actions to Waiting
    pub fn disable_map(&mut self, name: &str) -> Result<()> {
        let index = self.map_index(name)?;
        if !self.maps[index].enabled {
            return Ok(());
        }
        self.maps[index].enabled = false;
        let removed = self.unregister_map_monitors(index);
        self.actions.set_map_enabled(index, false);
        info!(map = name, monitors = removed, "Action map disabled");
        Ok(())
    }

    /// Points a binding at `path` instead of its default path
    pub fn apply_binding_override(&mut self, map: &str, binding: usize, path: &str) -> Result<()> {
        self.set_binding_override(map, binding, Some(path.to_string()))
    }

    pub fn remove_binding_override(&mut self, map: &str, binding: usize) -> Result<()> {
        self.set_binding_override(map, binding, None)
    }

    fn set_binding_override(&mut self, map: &str, binding: usize, path: Option<String>) -> Result<()> {
        let index = self.map_index(map)?;
        if !self.maps[index].map.set_binding_override(binding, path) {
            return Err(InputError::UnknownBinding {
                map: map.to_string(),
                binding,
            });
        }
        self.resolve_reporting(index)
    }

    fn resolve_reporting(&mut self, index: usize) -> Result<()> {
        match self.resolve().into_iter().find(|(i, _)| *i == index) {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }

    /// Re-resolves every map against the current devices
    ///
    /// All action and interaction state is reset and pending timeouts are
    /// dropped. Returns the resolution errors by map index.
    fn resolve(&mut self) -> Vec<(usize, InputError)> {
        let mut failures = Vec::new();
        let mut resolver = BindingResolver::new(&self.registry, &self.settings, &self.devices);
        for (index, entry) in self.maps.iter_mut().enumerate() {
            match resolver.add_map(&entry.map) {
                Ok(_) => entry.error = None,
                Err(e) => {
                    entry.error = Some(e.to_string());
                    failures.push((index, e));
                }
            }
        }
        let tables = resolver.finish();
        for warning in &tables.warnings {
            debug!(warning = %warning, "Resolution warning");
        }

        // Changes recorded earlier in a pass still reach listeners
        let pending = self.actions.take_changes();
        self.actions = ActionStateMachine::new(tables, self.settings.clone());
        self.actions.requeue_changes(pending);
        self.monitors.clear();
        for index in 0..self.maps.len() {
            if self.maps[index].enabled {
                self.register_map_monitors(index);
                self.actions.set_map_enabled(index, true);
            }
        }
        debug!(
            maps = self.maps.len(),
            monitors = self.monitors.total_monitor_count(),
            "Resolved action maps"
        );
        failures
    }

    fn unregister_map_monitors(&mut self, map: usize) -> usize {
        let tables = self.actions.tables();
        let Some(Some(indices)) = tables.maps.get(map) else {
            return 0;
        };
        indices
            .controls
            .clone()
            .map(|control| {
                let device = tables.controls[control].device_index;
                self.monitors.unregister(device, control, map)
            })
            .sum()
    }

    fn register_map_monitors(&mut self, map: usize) {
        let tables = self.actions.tables();
        let Some(Some(indices)) = tables.maps.get(map) else {
            return;
        };
        let mut rejected = 0;
        for control in indices.controls.clone() {
            let resolved = &tables.controls[control];
            let listener = MonitorListener {
                map,
                binding: tables.control_to_binding[control],
                control,
            };
            if self
                .monitors
                .register(resolved.device_index, MonitorRegion::from(resolved.block), listener)
                .is_err()
            {
                rejected += 1;
            }
        }
        if rejected > 0 {
            warn!(map, rejected, "Some controls cannot be monitored");
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn find_action(&self, map: &str, action: &str) -> Result<usize> {
        let index = self.map_index(map)?;
        self.actions
            .find_action(index, action)
            .ok_or_else(|| InputError::UnknownAction {
                map: map.to_string(),
                action: action.to_string(),
            })
    }

    pub fn action_state(&self, map: &str, action: &str) -> Result<&ActionState> {
        let index = self.find_action(map, action)?;
        self.actions
            .action(index)
            .ok_or_else(|| InputError::UnknownAction {
                map: map.to_string(),
                action: action.to_string(),
            })
    }

    pub fn action_phase(&self, map: &str, action: &str) -> Result<ActionPhase> {
        Ok(self.action_state(map, action)?.trigger.phase)
    }

    /// Value of an action as the front buffer of `pass` holds it
    pub fn action_value(&self, map: &str, action: &str, pass: UpdateType) -> Result<ControlValue> {
        let index = self.find_action(map, action)?;
        let reader = BufferReader {
            buffers: &self.buffers,
            pass: self.observed_buffer(pass),
        };
        Ok(self.actions.action_value(index, &reader))
    }

    fn control_block(&self, id: DeviceId, path: &str) -> Result<(usize, StateBlock)> {
        let index = self.require_device(id)?;
        let controls = self.devices[index].controls();
        controls
            .find(path)
            .and_then(|c| controls.node(c))
            .map(|node| (index, node.block))
            .ok_or_else(|| InputError::UnknownControl {
                device: id,
                path: path.to_string(),
            })
    }

    /// Value of a control as `pass` currently observes it
    pub fn read_control(&self, id: DeviceId, path: &str, pass: UpdateType) -> Result<ControlValue> {
        let (index, block) = self.control_block(id, path)?;
        Ok(self
            .current_view(pass, index)
            .map(|view| block.read(view))
            .unwrap_or_default())
    }

    /// Press state of a control during the latest update of `pass`
    ///
    /// Compares the state the pass observes with the state it replaced.
    /// Passes that have not seen the device change since their last tick
    /// report a steady state.
    pub fn button_state(&self, id: DeviceId, path: &str, pass: UpdateType) -> Result<ButtonState> {
        let (index, block) = self.control_block(id, path)?;
        let Some(buffer_pass) = self.observed_buffer(pass) else {
            return Ok(ButtonState::Released);
        };
        let press_point = self.settings.default_button_press_point;
        let is_down = |view: Option<StateView<'_>>| {
            view.is_some_and(|v| block.read(v).magnitude() >= press_point)
        };
        let front = is_down(self.buffers.front(buffer_pass, index));
        let back = is_down(self.buffers.back(buffer_pass, index));

        if matches!(pass, UpdateType::BeforeRender | UpdateType::Editor) {
            return Ok(ButtonState::from_edge(back, front));
        }
        let count = self.update_counts[buffer_pass];
        let last_flip = self.devices[index].last_flip[buffer_pass];
        Ok(match last_flip.cmp(&count) {
            std::cmp::Ordering::Equal => ButtonState::from_edge(back, front),
            // Flipped ahead for the next tick; the current tick saw the back
            std::cmp::Ordering::Greater => ButtonState::steady(back),
            std::cmp::Ordering::Less => ButtonState::steady(front),
        })
    }

    /// Buffer half holding the state `pass` observes for a device
    fn current_view(&self, pass: UpdateType, index: usize) -> Option<StateView<'_>> {
        let buffer_pass = self.observed_buffer(pass)?;
        let ahead = matches!(pass, UpdateType::Dynamic | UpdateType::Fixed)
            && self.devices[index].last_flip[buffer_pass] > self.update_counts[buffer_pass];
        if ahead {
            self.buffers.back(buffer_pass, index)
        } else {
            self.buffers.front(buffer_pass, index)
        }
    }

    /// Buffer that `pass` reads and compares against
    fn observed_buffer(&self, pass: UpdateType) -> Option<UpdateType> {
        let preferred = match pass {
            UpdateType::Dynamic | UpdateType::BeforeRender => UpdateType::Dynamic,
            UpdateType::Fixed => UpdateType::Fixed,
            UpdateType::Editor => UpdateType::Editor,
        };
        if self.buffers.is_allocated(preferred) {
            return Some(preferred);
        }
        if pass == UpdateType::Editor {
            return None;
        }
        [UpdateType::Dynamic, UpdateType::Fixed]
            .into_iter()
            .find(|p| self.buffers.is_allocated(*p))
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Runs one update of `pass` over `events` at time `now`
    pub fn update(&mut self, pass: UpdateType, events: &mut InputEventBuffer, now: f64) -> UpdateStats {
        let mut stats = UpdateStats::default();
        let Some(observed) = self.observed_buffer(pass) else {
            debug!(pass = %pass, "Update pass has no state buffers");
            return stats;
        };
        self.update_counts[pass] += 1;

        // Timeouts due by `now` fire before this pass's events are applied
        let reader = BufferReader {
            buffers: &self.buffers,
            pass: Some(observed),
        };
        stats.timeouts_fired = self.actions.process_timeouts(now, &reader);

        let offsets: Vec<usize> = events.iter().map(|e| e.offset).collect();
        for offset in offsets {
            let Some(event) = events.event_at(offset) else {
                break;
            };
            if event.header.is_handled() {
                continue;
            }

            let device_id = event.header.device();
            let Some(index) = self.device_index(device_id) else {
                trace!(device = %device_id, kind = %event.header.kind, "Event for unknown device");
                stats.unknown_device += 1;
                events.mark_handled(offset);
                continue;
            };
            if pass == UpdateType::BeforeRender && !self.devices[index].updates_before_render() {
                continue;
            }

            match event.header.kind {
                kind if kind == STATE_EVENT || kind == DELTA_STATE_EVENT => {
                    self.apply_state_event(pass, observed, index, &event, &mut stats);
                }
                kind if kind == TEXT_EVENT => {
                    if let Some(character) = event.text() {
                        let device = &mut self.devices[index];
                        device.push_text(character);
                        for listener in &mut self.listeners {
                            listener.on_text_input(device, character);
                        }
                    }
                }
                kind if kind == DEVICE_REMOVED_EVENT => {
                    self.remove_device_at(index);
                }
                kind if kind == DEVICE_CONFIG_CHANGED_EVENT => {
                    self.devices[index].bump_config_generation();
                    self.notify_device(index, DeviceChange::ConfigurationChanged);
                }
                kind => {
                    trace!(%kind, device = %device_id, "Ignoring event of unknown kind");
                }
            }

            events.mark_handled(offset);
            stats.events_processed += 1;
        }

        if pass != UpdateType::Editor {
            stats.continuous_fired = self.actions.fire_continuous(now);
        }

        let changes = self.actions.take_changes();
        for change in &changes {
            for listener in &mut self.listeners {
                listener.on_action_change(change);
            }
        }
        stats.notifications = changes.len();

        trace!(pass = %pass, ?stats, "Update finished");
        stats
    }

    fn apply_state_event(
        &mut self,
        pass: UpdateType,
        observed: UpdateType,
        index: usize,
        event: &EventRef<'_>,
        stats: &mut UpdateStats,
    ) {
        let device = &self.devices[index];
        let time = event.header.time;
        if time < device.last_update_time {
            trace!(device = %device.id(), time, last = device.last_update_time, "Dropping stale event");
            stats.stale_dropped += 1;
            return;
        }
        let Some((prefix, payload)) = event.state() else {
            debug!(device = %device.id(), "Malformed state event");
            return;
        };
        if prefix.format != device.format() {
            let e = InputError::StateFormatMismatch {
                device: device.id(),
                expected: device.format(),
                actual: prefix.format,
            };
            warn!(error = %e, "Dropping state event");
            stats.format_mismatches += 1;
            return;
        }

        let offset = if event.header.kind == DELTA_STATE_EVENT {
            prefix.state_offset as usize
        } else {
            0
        };
        let size = device.state_size();
        if offset >= size {
            trace!(device = %device.id(), offset, size, "State event lies outside the device");
            stats.truncated += 1;
            return;
        }
        let len = payload.len().min(size - offset);
        if len < payload.len() {
            trace!(device = %device.id(), len = payload.len(), size, "Truncating state event");
            stats.truncated += 1;
        }
        let bytes = &payload[..len];

        if let Some(front) = self.buffers.front(observed, index)
            && self.monitors.scan(index, bytes, front.bytes(), offset as u32)
        {
            stats.monitors_signalled += 1;
        }

        let targets = self.flip_for_event(pass, index);
        for (buffer_pass, target) in targets {
            let (Some(flipped), Some(buffers)) = (target, self.buffers.buffers_mut(buffer_pass))
            else {
                continue;
            };
            let (mut front, back) = buffers.front_and_back_mut(index);
            if flipped {
                front.copy_from(back.as_view().bytes());
            }
            front.write(offset, bytes);
        }
        self.devices[index].last_update_time = time;

        let mut signals = std::mem::take(&mut self.signals);
        signals.clear();
        self.monitors.drain_signalled(index, &mut signals);
        let reader = BufferReader {
            buffers: &self.buffers,
            pass: Some(observed),
        };
        for signal in &signals {
            self.actions
                .process_control_change(signal.binding, signal.control, time, &reader);
        }
        self.signals = signals;
    }

    /// Swaps the buffers an event must reach, at most once per tick each
    ///
    /// A pass flips its own buffer for its current tick. Dynamic and fixed
    /// buffers of other passes are flipped for their next tick, so the event
    /// is visible to whichever of them runs next. Editor passes only touch
    /// editor buffers and flip them for every event.
    fn flip_for_event(&mut self, pass: UpdateType, index: usize) -> WriteTargets {
        let mut targets = WriteTargets::default();
        let device = &mut self.devices[index];

        if pass == UpdateType::Editor {
            if self.buffers.is_allocated(UpdateType::Editor) {
                self.buffers.swap_buffers(UpdateType::Editor, index);
                device.last_flip[UpdateType::Editor] = self.update_counts[UpdateType::Editor];
                targets[UpdateType::Editor] = Some(true);
            }
            return targets;
        }

        for buffer_pass in [UpdateType::Dynamic, UpdateType::Fixed] {
            if !self.buffers.is_allocated(buffer_pass) {
                continue;
            }
            let tick = if buffer_pass == pass {
                self.update_counts[buffer_pass]
            } else {
                self.update_counts[buffer_pass] + 1
            };
            let flipped = device.last_flip[buffer_pass] != tick;
            if flipped {
                self.buffers.swap_buffers(buffer_pass, index);
                device.last_flip[buffer_pass] = tick;
            }
            targets[buffer_pass] = Some(flipped);
        }
        targets
    }
}

impl std::fmt::Debug for InputSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSystem")
            .field("devices", &self.devices.len())
            .field("maps", &self.maps)
            .field("update_counts", &self.update_counts)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

fn abort_on_capacity(e: &InputError) -> ! {
    error!(error = %e, "Cannot continue without device state memory");
    std::process::abort()
}
