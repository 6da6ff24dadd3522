//! Compiles action maps into flat runtime tables
//!
//! Each map's binding list is walked once, left to right. Every descriptor
//! produces exactly one [`BindingState`], so binding indices stay parallel to
//! descriptor order within a map. Controls, interactions and composites are
//! appended to shared tables and referenced by index range.

use std::ops::Range;

use tracing::{debug, error, warn};

use super::composites::CompositeBinding;
use super::interactions::Interaction;
use super::{
    ActionMap, ActionPhase, BindingDescriptor, ControlHandle, InputRegistry, InternedString,
    NameAndParameters,
};
use crate::config::InputSettings;
use crate::device::{ControlPath, Device, DeviceId, StateBlock};
use crate::error::{InputError, Result};

/// One control a binding resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedControl {
    pub device: DeviceId,
    /// Device index at resolution time
    pub device_index: usize,
    /// Index in the device's control tree
    pub control: usize,
    pub block: StateBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingState {
    pub map: usize,
    /// Global action index; `None` when the action name matched nothing
    pub action: Option<usize>,
    /// For composite heads this spans the controls of all parts
    pub controls: Range<usize>,
    pub interactions: Range<usize>,
    pub composite: Option<usize>,
    pub is_composite: bool,
    pub is_part_of_composite: bool,
}

#[derive(Debug)]
pub struct InteractionState {
    pub interaction: Box<dyn Interaction>,
    pub phase: ActionPhase,
    pub start_time: f64,
    pub timer_running: bool,
    pub binding: usize,
}

#[derive(Debug)]
pub struct CompositeState {
    pub composite: Box<dyn CompositeBinding>,
    /// The composite head binding
    pub binding: usize,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct ActionInfo {
    pub name: InternedString,
    pub map: usize,
    pub continuous: bool,
}

/// Table ranges owned by one resolved map
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapIndices {
    pub actions: Range<usize>,
    pub bindings: Range<usize>,
    pub controls: Range<usize>,
    pub interactions: Range<usize>,
    pub composites: Range<usize>,
}

/// Output of a resolution run
#[derive(Debug, Default)]
pub struct ResolvedTables {
    pub controls: Vec<ResolvedControl>,
    /// Parallel to `controls`: the ordinary or part binding owning each control
    pub control_to_binding: Vec<usize>,
    pub interactions: Vec<InteractionState>,
    pub composites: Vec<CompositeState>,
    pub bindings: Vec<BindingState>,
    pub actions: Vec<ActionInfo>,
    /// Per map in resolution order; `None` if resolution failed
    pub maps: Vec<Option<MapIndices>>,
    /// Configuration errors met along the way; offending items were dropped
    pub warnings: Vec<InputError>,
}

/// Comparable summary of [`ResolvedTables`]
#[derive(Debug, Clone, PartialEq)]
pub struct TablesLayout {
    pub controls: Vec<ResolvedControl>,
    pub control_to_binding: Vec<usize>,
    pub bindings: Vec<BindingState>,
    pub interactions: Vec<(&'static str, usize)>,
    pub composite_slots: Vec<Vec<(&'static str, Option<ControlHandle>)>>,
    pub actions: Vec<String>,
    pub maps: Vec<Option<MapIndices>>,
}

impl ResolvedTables {
    pub fn layout(&self) -> TablesLayout {
        TablesLayout {
            controls: self.controls.clone(),
            control_to_binding: self.control_to_binding.clone(),
            bindings: self.bindings.clone(),
            interactions: self
                .interactions
                .iter()
                .map(|i| (i.interaction.name(), i.binding))
                .collect(),
            composite_slots: self.composites.iter().map(|c| c.composite.slots()).collect(),
            actions: self
                .actions
                .iter()
                .map(|a| a.name.as_str().to_string())
                .collect(),
            maps: self.maps.clone(),
        }
    }

    /// Binding whose change drives the action logic for `binding`
    ///
    /// Parts route to their composite head.
    pub fn driving_binding(&self, binding: usize) -> Option<usize> {
        let state = self.bindings.get(binding)?;
        if state.is_part_of_composite {
            state
                .composite
                .and_then(|c| self.composites.get(c))
                .map(|c| c.binding)
        } else {
            Some(binding)
        }
    }

    fn checkpoint(&self) -> [usize; 5] {
        [
            self.controls.len(),
            self.interactions.len(),
            self.composites.len(),
            self.bindings.len(),
            self.actions.len(),
        ]
    }

    fn rollback(&mut self, [controls, interactions, composites, bindings, actions]: [usize; 5]) {
        self.controls.truncate(controls);
        self.control_to_binding.truncate(controls);
        self.interactions.truncate(interactions);
        self.composites.truncate(composites);
        self.bindings.truncate(bindings);
        self.actions.truncate(actions);
    }
}

enum Chain {
    None,
    Active { composite: usize, head: usize },
    /// Head was dropped; its parts resolve to nothing
    Dropped { head: usize },
}

/// Resolves action maps against a fixed device topology
pub struct BindingResolver<'a> {
    registry: &'a InputRegistry,
    settings: &'a InputSettings,
    devices: &'a [Device],
    tables: ResolvedTables,
}

impl<'a> BindingResolver<'a> {
    pub fn new(
        registry: &'a InputRegistry,
        settings: &'a InputSettings,
        devices: &'a [Device],
    ) -> Self {
        Self {
            registry,
            settings,
            devices,
            tables: ResolvedTables::default(),
        }
    }

    /// Appends a map's entries to the tables
    ///
    /// On a resolution error the map's partial entries are removed, the map
    /// is recorded as `None` and the error is returned.
    pub fn add_map(&mut self, map: &ActionMap) -> Result<MapIndices> {
        let map_index = self.tables.maps.len();
        let checkpoint = self.tables.checkpoint();

        match self.resolve_map(map_index, map) {
            Ok(indices) => {
                debug!(
                    map = map.name(),
                    bindings = indices.bindings.len(),
                    controls = indices.controls.len(),
                    "Resolved action map"
                );
                self.tables.maps.push(Some(indices.clone()));
                Ok(indices)
            }
            Err(e) => {
                error!(map = map.name(), error = %e, "Failed to resolve action map");
                self.tables.rollback(checkpoint);
                self.tables.maps.push(None);
                Err(e)
            }
        }
    }

    pub fn tables(&self) -> &ResolvedTables {
        &self.tables
    }

    pub fn finish(self) -> ResolvedTables {
        self.tables
    }

    fn resolve_map(&mut self, map_index: usize, map: &ActionMap) -> Result<MapIndices> {
        let [control_start, interaction_start, composite_start, binding_start, action_start] =
            self.tables.checkpoint();

        for action in map.actions() {
            self.tables.actions.push(ActionInfo {
                name: action.name.clone(),
                map: map_index,
                continuous: action.continuous,
            });
        }

        let mut chain = Chain::None;
        for (i, desc) in map.bindings().iter().enumerate() {
            if desc.is_part_of_composite {
                self.resolve_part(map_index, i, desc, &chain)?;
                continue;
            }

            self.end_chain(&mut chain);
            let action = map.action_index(&desc.action).map(|a| action_start + a);
            if desc.is_composite {
                chain = self.resolve_composite(map_index, desc, action);
            } else {
                let binding_index = self.tables.bindings.len();
                let controls_start = self.tables.controls.len();
                let controls = self.resolve_path(desc.effective_path());
                self.tables.controls.extend(controls);
                let interactions = self.instantiate_interactions(desc, binding_index);
                self.tables.bindings.push(BindingState {
                    map: map_index,
                    action,
                    controls: controls_start..self.tables.controls.len(),
                    interactions,
                    composite: None,
                    is_composite: false,
                    is_part_of_composite: false,
                });
            }
        }
        self.end_chain(&mut chain);

        // Route every new control back to the binding that owns it
        self.tables
            .control_to_binding
            .resize(self.tables.controls.len(), usize::MAX);
        for (index, binding) in self.tables.bindings.iter().enumerate().skip(binding_start) {
            if binding.is_composite {
                continue;
            }
            for control in binding.controls.clone() {
                self.tables.control_to_binding[control] = index;
            }
        }

        Ok(MapIndices {
            actions: action_start..self.tables.actions.len(),
            bindings: binding_start..self.tables.bindings.len(),
            controls: control_start..self.tables.controls.len(),
            interactions: interaction_start..self.tables.interactions.len(),
            composites: composite_start..self.tables.composites.len(),
        })
    }

    fn resolve_composite(
        &mut self,
        map_index: usize,
        desc: &BindingDescriptor,
        action: Option<usize>,
    ) -> Chain {
        let binding_index = self.tables.bindings.len();
        let composite = NameAndParameters::parse(&desc.path)
            .and_then(|params| self.registry.create_composite(&params));
        let composite_index = match composite {
            Ok(composite) => {
                self.tables.composites.push(CompositeState {
                    composite,
                    binding: binding_index,
                    finished: false,
                });
                Some(self.tables.composites.len() - 1)
            }
            Err(e) => {
                self.warn(e);
                None
            }
        };

        let interactions = self.instantiate_interactions(desc, binding_index);
        let controls_start = self.tables.controls.len();
        self.tables.bindings.push(BindingState {
            map: map_index,
            action,
            controls: controls_start..controls_start,
            interactions,
            composite: composite_index,
            is_composite: true,
            is_part_of_composite: false,
        });

        match composite_index {
            Some(composite) => Chain::Active {
                composite,
                head: binding_index,
            },
            None => Chain::Dropped {
                head: binding_index,
            },
        }
    }

    fn resolve_part(
        &mut self,
        map_index: usize,
        descriptor_index: usize,
        desc: &BindingDescriptor,
        chain: &Chain,
    ) -> Result<()> {
        let (composite, head) = match *chain {
            Chain::None => {
                return Err(InputError::CompositePartOutsideComposite {
                    binding: descriptor_index,
                });
            }
            Chain::Active { composite, head } => (Some(composite), head),
            Chain::Dropped { head } => (None, head),
        };

        let name = desc
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(InputError::UnnamedCompositePart {
                binding: descriptor_index,
            })?;

        let path = desc.effective_path();
        let controls = self.resolve_path(path);
        if controls.len() > 1 {
            return Err(InputError::CompositePartResolvedToMultipleControls {
                binding: descriptor_index,
                path: path.to_string(),
                count: controls.len(),
            });
        }

        let controls_start = self.tables.controls.len();
        if let (Some(composite), Some(control)) = (composite, controls.first()) {
            let state = &mut self.tables.composites[composite];
            match state.composite.set_slot(name, ControlHandle(controls_start)) {
                Ok(()) => self.tables.controls.push(*control),
                Err(source) => {
                    let e = InputError::CompositeSlot {
                        composite: state.composite.name().to_string(),
                        binding: descriptor_index,
                        source,
                    };
                    self.warn(e);
                }
            }
        }

        let action = self.tables.bindings[head].action;
        let controls_end = self.tables.controls.len();
        self.tables.bindings[head].controls.end = controls_end;
        self.tables.bindings.push(BindingState {
            map: map_index,
            action,
            controls: controls_start..controls_end,
            interactions: self.tables.interactions.len()..self.tables.interactions.len(),
            composite,
            is_composite: false,
            is_part_of_composite: true,
        });
        Ok(())
    }

    fn end_chain(&mut self, chain: &mut Chain) {
        if let Chain::Active { composite, .. } = std::mem::replace(chain, Chain::None) {
            let state = &mut self.tables.composites[composite];
            state.composite.finish();
            state.finished = true;
        }
    }

    fn resolve_path(&mut self, path: &str) -> Vec<ResolvedControl> {
        let parsed = match ControlPath::parse(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.warn(e);
                return Vec::new();
            }
        };

        parsed
            .resolve(self.devices)
            .into_iter()
            .filter_map(|(device_index, control)| {
                let device = &self.devices[device_index];
                let node = device.controls().node(control)?;
                Some(ResolvedControl {
                    device: device.id(),
                    device_index,
                    control,
                    block: node.block,
                })
            })
            .collect()
    }

    fn instantiate_interactions(
        &mut self,
        desc: &BindingDescriptor,
        binding_index: usize,
    ) -> Range<usize> {
        let start = self.tables.interactions.len();
        let entries = match NameAndParameters::parse_list(&desc.interactions) {
            Ok(entries) => entries,
            Err(e) => {
                self.warn(e);
                return start..start;
            }
        };

        for params in entries {
            match self.registry.create_interaction(&params, self.settings) {
                Ok(interaction) => self.tables.interactions.push(InteractionState {
                    interaction,
                    phase: ActionPhase::Waiting,
                    start_time: 0.0,
                    timer_running: false,
                    binding: binding_index,
                }),
                Err(e) => self.warn(e),
            }
        }
        start..self.tables.interactions.len()
    }

    fn warn(&mut self, e: InputError) {
        warn!(error = %e, "Dropping misconfigured binding item");
        self.tables.warnings.push(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ControlTree, FourCc};

    fn gamepad(name: &str) -> Device {
        let tree = ControlTree::builder()
            .button("buttonSouth", 0, 0)
            .button("buttonEast", 0, 1)
            .button("dpad/up", 0, 4)
            .button("dpad/down", 0, 5)
            .button("dpad/left", 0, 6)
            .button("dpad/right", 0, 7)
            .build();
        let mut device = Device::new(name, "Gamepad", FourCc::new(b"GPAD"), tree);
        device.set_id(DeviceId(1));
        device
    }

    fn move_map() -> ActionMap {
        ActionMap::new("gameplay")
            .with_action("Jump")
            .with_continuous_action("Move")
            .with_binding(BindingDescriptor::new("Jump", "<Gamepad>/buttonSouth"))
            .with_binding(BindingDescriptor::composite("Move", "2DVector"))
            .with_binding(BindingDescriptor::part("up", "<Gamepad>/dpad/up"))
            .with_binding(BindingDescriptor::part("down", "<Gamepad>/dpad/down"))
            .with_binding(BindingDescriptor::part("left", "<Gamepad>/dpad/left"))
            .with_binding(BindingDescriptor::part("right", "<Gamepad>/dpad/right"))
            .with_binding(
                BindingDescriptor::new("Jump", "<Gamepad>/buttonEast").with_interactions("hold"),
            )
    }

    fn resolve(devices: &[Device], maps: &[ActionMap]) -> ResolvedTables {
        let registry = InputRegistry::with_defaults();
        let settings = InputSettings::default();
        let mut resolver = BindingResolver::new(&registry, &settings, devices);
        for map in maps {
            let _ = resolver.add_map(map);
        }
        resolver.finish()
    }

    #[test]
    fn test_composite_head_spans_parts() {
        let devices = vec![gamepad("pad")];
        let tables = resolve(&devices, &[move_map()]);

        assert_eq!(tables.bindings.len(), 7);
        assert_eq!(tables.controls.len(), 6);
        let head = &tables.bindings[1];
        assert!(head.is_composite);
        assert_eq!(head.controls, 1..5);
        assert_eq!(head.action, Some(1));
        assert!(tables.composites[0].finished);

        // Parts inherit the head's action and own one control each
        assert_eq!(tables.bindings[2].controls, 1..2);
        assert_eq!(tables.bindings[2].action, Some(1));
        assert_eq!(tables.control_to_binding, vec![0, 2, 3, 4, 5, 6]);
        assert_eq!(tables.driving_binding(3), Some(1));
        assert_eq!(tables.interactions.len(), 1);
        assert_eq!(tables.interactions[0].binding, 6);
    }

    #[test]
    fn test_path_matching_many_devices() {
        let devices = vec![gamepad("pad1"), gamepad("pad2")];
        let map = ActionMap::new("m")
            .with_action("Jump")
            .with_binding(BindingDescriptor::new("Jump", "<Gamepad>/buttonSouth"));
        let tables = resolve(&devices, &[map]);
        assert_eq!(tables.bindings[0].controls, 0..2);
        assert_eq!(tables.controls[1].device_index, 1);
    }

    #[test]
    fn test_part_matching_two_controls_fails() {
        let devices = vec![gamepad("pad1"), gamepad("pad2")];
        let registry = InputRegistry::with_defaults();
        let settings = InputSettings::default();
        let mut resolver = BindingResolver::new(&registry, &settings, &devices);

        let result = resolver.add_map(&move_map());
        assert!(matches!(
            result,
            Err(InputError::CompositePartResolvedToMultipleControls { count: 2, .. })
        ));
        let tables = resolver.finish();
        assert!(tables.composites.is_empty());
        assert!(tables.bindings.is_empty());
        assert!(tables.actions.is_empty());
        assert_eq!(tables.maps, vec![None]);
    }

    #[test]
    fn test_resolution_errors() {
        let devices = vec![gamepad("pad")];

        let unnamed = ActionMap::new("m")
            .with_action("Move")
            .with_binding(BindingDescriptor::composite("Move", "2DVector"))
            .with_binding(BindingDescriptor {
                name: None,
                ..BindingDescriptor::part("", "<Gamepad>/dpad/up")
            });
        let orphan = ActionMap::new("m")
            .with_action("Move")
            .with_binding(BindingDescriptor::part("up", "<Gamepad>/dpad/up"));

        let registry = InputRegistry::with_defaults();
        let settings = InputSettings::default();
        let mut resolver = BindingResolver::new(&registry, &settings, &devices);
        assert!(matches!(
            resolver.add_map(&unnamed),
            Err(InputError::UnnamedCompositePart { binding: 1 })
        ));
        assert!(matches!(
            resolver.add_map(&orphan),
            Err(InputError::CompositePartOutsideComposite { binding: 0 })
        ));
    }

    #[test]
    fn test_configuration_errors_drop_items() {
        let devices = vec![gamepad("pad")];
        let map = ActionMap::new("m")
            .with_action("Jump")
            .with_action("Move")
            .with_binding(
                BindingDescriptor::new("Jump", "<Gamepad>/buttonSouth")
                    .with_interactions("hold,wiggle"),
            )
            .with_binding(BindingDescriptor::composite("Move", "Joystick"))
            .with_binding(BindingDescriptor::part("up", "<Gamepad>/dpad/up"))
            .with_binding(BindingDescriptor::new("Jump", "not a path"))
            .with_binding(BindingDescriptor::composite("Move", "2DVector"))
            .with_binding(BindingDescriptor::part("north", "<Gamepad>/dpad/up"));
        let tables = resolve(&devices, &[map]);

        assert!(tables.maps[0].is_some());
        assert_eq!(tables.warnings.len(), 4);
        assert!(matches!(
            tables.warnings[0],
            InputError::UnknownInteraction { .. }
        ));
        assert!(matches!(tables.warnings[1], InputError::UnknownComposite { .. }));
        assert!(matches!(tables.warnings[2], InputError::InvalidPath { .. }));
        assert!(matches!(tables.warnings[3], InputError::CompositeSlot { .. }));

        // Dropped composite: the part binding exists but owns nothing
        assert_eq!(tables.bindings.len(), 6);
        assert_eq!(tables.bindings[1].composite, None);
        assert!(tables.bindings[2].controls.is_empty());
        assert_eq!(tables.interactions.len(), 1);
    }

    #[test]
    fn test_unmatched_action_resolves_without_effect() {
        let devices = vec![gamepad("pad")];
        let map = ActionMap::new("m")
            .with_binding(BindingDescriptor::new("Nothing", "<Gamepad>/buttonSouth"));
        let tables = resolve(&devices, &[map]);
        assert_eq!(tables.bindings[0].action, None);
        assert_eq!(tables.bindings[0].controls, 0..1);
    }

    #[test]
    fn test_override_path_takes_precedence() {
        let devices = vec![gamepad("pad")];
        let map = ActionMap::new("m").with_action("Jump").with_binding(
            BindingDescriptor::new("Jump", "<Gamepad>/buttonSouth")
                .with_override("<Gamepad>/buttonEast"),
        );
        let tables = resolve(&devices, &[map]);
        assert_eq!(tables.controls[0].block, StateBlock::bit(0, 1));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let devices = vec![gamepad("pad")];
        let maps = [move_map(), move_map()];
        let first = resolve(&devices, &maps);
        let second = resolve(&devices, &maps);
        assert_eq!(first.layout(), second.layout());
        assert_eq!(first.maps[1].as_ref().unwrap().bindings, 7..14);
    }
}
