//! Phase transitions of actions
//!
//! Monitor signals arrive as `(binding, control, time)` triples. Part
//! bindings route to their composite head. Bindings without interactions
//! use the default trigger; otherwise every interaction of the binding
//! processes the change and its requests are applied in order.
//!
//! At most one interaction drives an action at a time. When the driver
//! cancels, the next started interaction of the same action (in binding
//! order) takes over silently. Every phase change of an action is recorded
//! as an [`ActionChange`].

use tracing::{debug, trace};

use super::composites::CompositeContext;
use super::interactions::{InteractionContext, PhaseRequest};
use super::{
    ActionInfo, ActionPhase, ControlReader, ResolvedTables, TimeoutEntry, TimeoutQueue,
};
use crate::config::InputSettings;
use crate::device::ControlValue;

/// Observable state of one action
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriggerState {
    pub phase: ActionPhase,
    /// Binding driving the action
    pub binding: Option<usize>,
    /// Control whose change caused the last transition
    pub control: Option<usize>,
    /// Interaction driving the action, if any
    pub interaction: Option<usize>,
    pub start_time: f64,
    pub last_performed: Option<f64>,
    /// Time of the last transition
    pub time: f64,
}

#[derive(Debug, Clone)]
pub struct ActionState {
    pub info: ActionInfo,
    pub trigger: TriggerState,
}

/// A recorded phase change
#[derive(Debug, Clone, PartialEq)]
pub struct ActionChange {
    pub map: usize,
    pub action: usize,
    pub action_name: String,
    pub phase: ActionPhase,
    pub binding: Option<usize>,
    pub control: Option<usize>,
    pub interaction: Option<usize>,
    pub time: f64,
}

/// Runtime state of every resolved action
#[derive(Debug)]
pub struct ActionStateMachine {
    settings: InputSettings,
    tables: ResolvedTables,
    actions: Vec<ActionState>,
    timeouts: TimeoutQueue,
    map_enabled: Vec<bool>,
    changes: Vec<ActionChange>,
}

impl Default for ActionStateMachine {
    fn default() -> Self {
        Self::new(ResolvedTables::default(), InputSettings::default())
    }
}

impl ActionStateMachine {
    /// Takes ownership of freshly resolved tables; all maps start disabled
    pub fn new(tables: ResolvedTables, settings: InputSettings) -> Self {
        let actions = tables
            .actions
            .iter()
            .map(|info| ActionState {
                info: info.clone(),
                trigger: TriggerState::default(),
            })
            .collect();
        let map_enabled = vec![false; tables.maps.len()];
        Self {
            settings,
            tables,
            actions,
            timeouts: TimeoutQueue::new(),
            map_enabled,
            changes: Vec::new(),
        }
    }

    pub fn tables(&self) -> &ResolvedTables {
        &self.tables
    }

    pub fn actions(&self) -> &[ActionState] {
        &self.actions
    }

    pub fn action(&self, action: usize) -> Option<&ActionState> {
        self.actions.get(action)
    }

    /// Global index of the action called `name` in map `map`
    pub fn find_action(&self, map: usize, name: &str) -> Option<usize> {
        self.actions
            .iter()
            .position(|a| a.info.map == map && a.info.name.matches(name))
    }

    pub fn timeouts(&self) -> &TimeoutQueue {
        &self.timeouts
    }

    pub fn is_map_enabled(&self, map: usize) -> bool {
        self.map_enabled.get(map).copied().unwrap_or(false)
    }

    /// Enables or disables a map; disabling returns its actions and
    /// interactions to Waiting without recording changes
    pub fn set_map_enabled(&mut self, map: usize, enabled: bool) {
        let Some(slot) = self.map_enabled.get_mut(map) else {
            return;
        };
        *slot = enabled;
        if !enabled {
            self.reset_map(map);
        }
    }

    fn reset_map(&mut self, map: usize) {
        let Some(Some(indices)) = self.tables.maps.get(map).cloned() else {
            return;
        };
        for action in &mut self.actions[indices.actions.clone()] {
            action.trigger = TriggerState::default();
        }
        for state in &mut self.tables.interactions[indices.interactions.clone()] {
            state.phase = ActionPhase::Waiting;
            state.timer_running = false;
            state.interaction.reset();
        }
        self.timeouts.remove_range(indices.interactions);
        debug!(map, "Reset action map");
    }

    /// Recorded changes since the last call
    pub fn take_changes(&mut self) -> Vec<ActionChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn changes(&self) -> &[ActionChange] {
        &self.changes
    }

    /// Puts changes taken from a replaced machine ahead of any recorded since
    pub fn requeue_changes(&mut self, changes: Vec<ActionChange>) {
        self.changes.splice(0..0, changes);
    }

    /// Handles a monitor signal for `control` owned by `binding`
    pub fn process_control_change(
        &mut self,
        binding: usize,
        control: usize,
        time: f64,
        reader: &dyn ControlReader,
    ) {
        let Some(state) = self.tables.bindings.get(binding) else {
            return;
        };
        if !self.is_map_enabled(state.map) {
            return;
        }
        let Some(binding) = self.tables.driving_binding(binding) else {
            return;
        };
        let head = &self.tables.bindings[binding];
        let Some(action) = head.action else {
            return;
        };
        let interactions = head.interactions.clone();

        let (value, magnitude) = self.read_binding(binding, control, reader);
        trace!(binding, control, magnitude, time, "Control changed");

        if interactions.is_empty() {
            self.process_default(action, binding, control, time, magnitude);
        } else {
            for interaction in interactions {
                self.run_interaction(
                    action,
                    binding,
                    control,
                    interaction,
                    time,
                    false,
                    value,
                    magnitude,
                );
            }
        }
    }

    /// Fires every timeout due at `now`; callbacks see `now` as their time
    pub fn process_timeouts(&mut self, now: f64, reader: &dyn ControlReader) -> usize {
        let due = self.timeouts.take_due(now);
        for entry in &due {
            self.fire_timeout(entry, now, reader);
        }
        due.len()
    }

    fn fire_timeout(&mut self, entry: &TimeoutEntry, now: f64, reader: &dyn ControlReader) {
        let Some(state) = self.tables.interactions.get_mut(entry.interaction) else {
            return;
        };
        state.timer_running = false;

        let Some(binding) = self.tables.bindings.get(entry.binding) else {
            return;
        };
        let (Some(action), true) = (binding.action, self.is_map_enabled(binding.map)) else {
            return;
        };
        trace!(interaction = entry.interaction, now, "Timeout fired");

        let (value, magnitude) = self.read_binding(entry.binding, entry.control, reader);
        self.run_interaction(
            action,
            entry.binding,
            entry.control,
            entry.interaction,
            now,
            true,
            value,
            magnitude,
        );
    }

    /// Re-records Performed for continuous actions that are still performed
    pub fn fire_continuous(&mut self, now: f64) -> usize {
        let mut fired = 0;
        for action in 0..self.actions.len() {
            let state = &self.actions[action];
            if state.info.continuous
                && state.trigger.phase == ActionPhase::Performed
                && self.is_map_enabled(state.info.map)
            {
                let trigger = state.trigger;
                self.record(
                    action,
                    ActionPhase::Performed,
                    trigger.binding,
                    trigger.control,
                    trigger.interaction,
                    now,
                );
                fired += 1;
            }
        }
        fired
    }

    /// Current value of an action, read from its driving binding
    pub fn action_value(&self, action: usize, reader: &dyn ControlReader) -> ControlValue {
        let Some(state) = self.actions.get(action) else {
            return ControlValue::default();
        };
        match (state.trigger.binding, state.trigger.control) {
            (Some(binding), Some(control)) => self.read_binding(binding, control, reader).0,
            _ => ControlValue::default(),
        }
    }

    fn read_binding(
        &self,
        binding: usize,
        control: usize,
        reader: &dyn ControlReader,
    ) -> (ControlValue, f32) {
        let state = &self.tables.bindings[binding];
        if state.is_composite {
            let Some(composite) = state.composite.and_then(|c| self.tables.composites.get(c))
            else {
                return (ControlValue::default(), 0.0);
            };
            let ctx = CompositeContext::new(
                &self.tables.controls,
                reader,
                self.settings.default_button_press_point,
            );
            return (
                composite.composite.read_value(&ctx),
                composite.composite.magnitude(&ctx),
            );
        }

        match self.tables.controls.get(control) {
            Some(resolved) => {
                let value = reader.read(resolved);
                (value, value.magnitude())
            }
            None => (ControlValue::default(), 0.0),
        }
    }

    /// Trigger for bindings without interactions
    ///
    /// Regular actions perform and return to Waiting in one step. Continuous
    /// actions stay performed while actuated and cancel on release.
    fn process_default(
        &mut self,
        action: usize,
        binding: usize,
        control: usize,
        time: f64,
        magnitude: f32,
    ) {
        let state = &self.actions[action];
        let phase = state.trigger.phase;

        if state.info.continuous {
            if phase == ActionPhase::Waiting && magnitude > 0.0 {
                self.record(action, ActionPhase::Performed, Some(binding), Some(control), None, time);
            } else if phase == ActionPhase::Performed && magnitude <= 0.0 {
                // Only the driving binding may release the action
                if state.trigger.binding == Some(binding) {
                    self.record(action, ActionPhase::Cancelled, Some(binding), Some(control), None, time);
                    self.record(action, ActionPhase::Waiting, None, None, None, time);
                }
            }
            return;
        }

        if phase == ActionPhase::Waiting && magnitude >= self.settings.default_button_press_point {
            self.record(action, ActionPhase::Performed, Some(binding), Some(control), None, time);
            self.record(action, ActionPhase::Waiting, None, None, None, time);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_interaction(
        &mut self,
        action: usize,
        binding: usize,
        control: usize,
        interaction: usize,
        time: f64,
        timer_expired: bool,
        value: ControlValue,
        magnitude: f32,
    ) {
        let continuous = self.actions[action].info.continuous;
        let state = &mut self.tables.interactions[interaction];
        let mut ctx = InteractionContext::new(&self.settings, state.phase, time)
            .with_start_time(state.start_time)
            .with_value(value, magnitude)
            .with_timer_expired(timer_expired)
            .with_continuous(continuous);
        state.interaction.process(&mut ctx);

        for request in ctx.into_requests() {
            match request {
                PhaseRequest::SetTimeout(seconds) => {
                    self.timeouts.insert(TimeoutEntry {
                        fire_time: time + f64::from(seconds),
                        binding,
                        control,
                        interaction,
                    });
                    self.tables.interactions[interaction].timer_running = true;
                }
                PhaseRequest::Started => {
                    self.interaction_started(action, binding, control, interaction, time)
                }
                PhaseRequest::Performed { then } => {
                    self.interaction_performed(action, binding, control, interaction, time, then)
                }
                PhaseRequest::Cancelled => {
                    self.interaction_cancelled(action, binding, control, interaction, time)
                }
            }
        }
    }

    /// Moves an interaction to `phase`; any phase change stops its timer
    fn set_interaction_phase(&mut self, interaction: usize, phase: ActionPhase, time: f64) {
        let state = &mut self.tables.interactions[interaction];
        if state.phase == phase {
            return;
        }
        state.phase = phase;
        if phase == ActionPhase::Started {
            state.start_time = time;
        }
        if state.timer_running {
            state.timer_running = false;
            self.timeouts.remove(interaction);
        }
    }

    fn interaction_started(
        &mut self,
        action: usize,
        binding: usize,
        control: usize,
        interaction: usize,
        time: f64,
    ) {
        self.set_interaction_phase(interaction, ActionPhase::Started, time);
        if self.actions[action].trigger.phase == ActionPhase::Waiting {
            self.record(
                action,
                ActionPhase::Started,
                Some(binding),
                Some(control),
                Some(interaction),
                time,
            );
        }
    }

    fn interaction_performed(
        &mut self,
        action: usize,
        binding: usize,
        control: usize,
        interaction: usize,
        time: f64,
        then: ActionPhase,
    ) {
        let trigger = self.actions[action].trigger;
        let drives = trigger.interaction == Some(interaction) || trigger.phase == ActionPhase::Waiting;
        let then = match then {
            ActionPhase::Cancelled => ActionPhase::Waiting,
            other => other,
        };

        if !drives {
            self.set_interaction_phase(interaction, then, time);
            return;
        }

        self.set_interaction_phase(interaction, ActionPhase::Performed, time);
        let driver = (Some(binding), Some(control), Some(interaction));
        self.record(action, ActionPhase::Performed, driver.0, driver.1, driver.2, time);
        self.reset_other_interactions(binding, interaction);

        match then {
            ActionPhase::Waiting | ActionPhase::Cancelled => {
                self.set_interaction_phase(interaction, ActionPhase::Waiting, time);
                self.record(action, ActionPhase::Waiting, None, None, None, time);
            }
            ActionPhase::Started => {
                self.set_interaction_phase(interaction, ActionPhase::Started, time);
                self.record(action, ActionPhase::Started, driver.0, driver.1, driver.2, time);
            }
            ActionPhase::Performed => {}
        }
    }

    fn interaction_cancelled(
        &mut self,
        action: usize,
        binding: usize,
        control: usize,
        interaction: usize,
        time: f64,
    ) {
        let was = self.tables.interactions[interaction].phase;
        self.set_interaction_phase(interaction, ActionPhase::Waiting, time);
        self.tables.interactions[interaction].interaction.reset();

        let trigger = self.actions[action].trigger;
        if was == ActionPhase::Waiting
            || trigger.phase == ActionPhase::Waiting
            || trigger.interaction != Some(interaction)
        {
            return;
        }

        if let Some(next) = self.next_started_interaction(action, interaction) {
            let next_binding = self.tables.interactions[next].binding;
            let next_control = self.tables.bindings[next_binding].controls.clone().next();
            let trigger = &mut self.actions[action].trigger;
            trigger.interaction = Some(next);
            trigger.binding = Some(next_binding);
            trigger.control = next_control;
            trigger.start_time = self.tables.interactions[next].start_time;
            trace!(action, from = interaction, to = next, "Driver handed over");
            return;
        }

        self.record(
            action,
            ActionPhase::Cancelled,
            Some(binding),
            Some(control),
            Some(interaction),
            time,
        );
        self.record(action, ActionPhase::Waiting, None, None, None, time);
    }

    /// First started interaction of `action` in binding order, other than `except`
    fn next_started_interaction(&self, action: usize, except: usize) -> Option<usize> {
        self.tables
            .bindings
            .iter()
            .filter(|b| b.action == Some(action) && !b.is_part_of_composite)
            .flat_map(|b| b.interactions.clone())
            .find(|&i| i != except && self.tables.interactions[i].phase == ActionPhase::Started)
    }

    fn reset_other_interactions(&mut self, binding: usize, except: usize) {
        for i in self.tables.bindings[binding].interactions.clone() {
            if i == except || self.tables.interactions[i].phase == ActionPhase::Waiting {
                continue;
            }
            let state = &mut self.tables.interactions[i];
            state.phase = ActionPhase::Waiting;
            state.timer_running = false;
            state.interaction.reset();
            self.timeouts.remove(i);
        }
    }

    /// Applies a phase change to an action and records it
    fn record(
        &mut self,
        action: usize,
        phase: ActionPhase,
        binding: Option<usize>,
        control: Option<usize>,
        interaction: Option<usize>,
        time: f64,
    ) {
        let state = &mut self.actions[action];
        let trigger = &mut state.trigger;
        match phase {
            ActionPhase::Started if trigger.phase == ActionPhase::Waiting => trigger.start_time = time,
            ActionPhase::Performed => trigger.last_performed = Some(time),
            _ => {}
        }
        trigger.phase = phase;
        trigger.binding = binding;
        trigger.control = control;
        trigger.interaction = interaction;
        trigger.time = time;

        trace!(action = %state.info.name, %phase, time, "Action phase changed");
        self.changes.push(ActionChange {
            map: state.info.map,
            action,
            action_name: state.info.name.as_str().to_string(),
            phase,
            binding,
            control,
            interaction,
            time,
        });
    }
}
