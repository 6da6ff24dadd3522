//! Binding resolution health check

use crate::actions::{BindingResolver, InputRegistry};
use crate::config::InputSettings;
use crate::health::check::{CheckResult, Findings, SystemCheck};
use crate::health::fixtures;

/// Resolves the demo map twice and compares the tables
pub struct ResolverCheck;

impl ResolverCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResolverCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for ResolverCheck {
    fn name(&self) -> &'static str {
        "Binding Resolver"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates that the demo action map resolves deterministically")
    }

    fn check(&self, settings: &InputSettings) -> CheckResult {
        let mut findings = Findings::new();
        let registry = InputRegistry::with_defaults();
        let devices = [fixtures::gamepad("pad1"), fixtures::keyboard("keyboard")];
        let map = fixtures::gameplay_map();

        let mut layouts = Vec::new();
        for _ in 0..2 {
            let mut resolver = BindingResolver::new(&registry, settings, &devices);
            if let Err(e) = resolver.add_map(&map) {
                findings.fail(format!("Resolution failed: {e}"));
                return findings.finish("");
            }
            let tables = resolver.finish();
            for warning in &tables.warnings {
                findings.warn(warning);
            }
            layouts.push(tables.layout());
        }

        let layout = &layouts[0];
        findings.ok(format!(
            "{} bindings, {} controls, {} interactions, {} composites",
            layout.bindings.len(),
            layout.controls.len(),
            layout.interactions.len(),
            layout.composite_slots.len()
        ));
        findings.expect(
            layout.bindings.len() == map.bindings().len(),
            "One binding state per descriptor",
        );
        findings.expect(
            layout.composite_slots.iter().flatten().all(|(_, handle)| handle.is_some()),
            "Every composite slot is filled",
        );
        findings.expect(layouts[0] == layouts[1], "Repeated resolution is identical");

        findings.finish("Demo map resolves idempotently")
    }
}
