//! Properties of binding resolution

use inputflow::actions::{BindingResolver, InputRegistry};
use inputflow::health::fixtures;
use inputflow::prelude::*;
use proptest::prelude::*;

const PATHS: [&str; 8] = [
    "<Gamepad>/buttonSouth",
    "<Gamepad>/dpad/*",
    "<Gamepad>/leftStick",
    "<Keyboard>/space",
    "*/buttonEast",
    "/pad2/leftTrigger",
    "{Player1}/start",
    "<Mouse>/leftButton",
];

const INTERACTIONS: [&str; 6] = [
    "",
    "press",
    "hold(duration=0.3)",
    "tap,hold",
    "multiTap(tapCount=3)",
    "wiggle",
];

#[derive(Debug, Clone)]
struct BindingSpec {
    action: usize,
    path: usize,
    interactions: usize,
}

fn binding_strategy() -> impl Strategy<Value = BindingSpec> {
    (0usize..3, 0..PATHS.len(), 0..INTERACTIONS.len()).prop_map(|(action, path, interactions)| {
        BindingSpec {
            action,
            path,
            interactions,
        }
    })
}

fn build_map(name: &str, specs: &[BindingSpec]) -> ActionMap {
    let mut map = ActionMap::new(name)
        .with_action("A0")
        .with_continuous_action("A1")
        .with_action("A2");
    for spec in specs {
        map.add_binding(
            BindingDescriptor::new(format!("A{}", spec.action), PATHS[spec.path])
                .with_interactions(INTERACTIONS[spec.interactions]),
        );
    }
    map
}

fn devices() -> Vec<Device> {
    vec![
        fixtures::gamepad("pad1").with_usage("Player1"),
        fixtures::gamepad("pad2").with_usage("Player2"),
        fixtures::keyboard("keyboard"),
    ]
}

proptest! {
    #[test]
    fn prop_resolution_is_deterministic(
        first in prop::collection::vec(binding_strategy(), 0..10),
        second in prop::collection::vec(binding_strategy(), 0..10),
    ) {
        let registry = InputRegistry::with_defaults();
        let settings = InputSettings::default();
        let devices = devices();
        let maps = [build_map("first", &first), build_map("second", &second)];

        let resolve = || {
            let mut resolver = BindingResolver::new(&registry, &settings, &devices);
            for map in &maps {
                resolver.add_map(map).unwrap();
            }
            resolver.finish()
        };
        let a = resolve();
        let b = resolve();

        prop_assert_eq!(a.layout(), b.layout());
        prop_assert_eq!(a.warnings.len(), b.warnings.len());
        prop_assert_eq!(a.controls.len(), a.control_to_binding.len());
        for (control, &binding) in a.control_to_binding.iter().enumerate() {
            prop_assert!(a.bindings[binding].controls.contains(&control));
        }
    }

    #[test]
    fn prop_system_monitors_every_enabled_control(
        specs in prop::collection::vec(binding_strategy(), 1..10),
        enable in any::<bool>(),
    ) {
        let mut system = InputSystem::new(InputSettings::default());
        let pad = system.add_device(fixtures::gamepad("pad1"));
        system.add_device(fixtures::keyboard("keyboard"));
        system.add_action_map(build_map("player", &specs)).unwrap();
        if enable {
            system.enable_map("player").unwrap();
        }

        let controls = system.actions().tables().controls.len();
        let expected = if enable { controls } else { 0 };
        prop_assert_eq!(system.monitors().total_monitor_count(), expected);

        // Topology changes re-resolve to the same shape
        let before = system.actions().tables().layout();
        system.add_device_usage(pad, "Player2").unwrap();
        let after = system.actions().tables().layout();
        prop_assert_eq!(before, after);
        prop_assert_eq!(system.monitors().total_monitor_count(), expected);
    }
}
