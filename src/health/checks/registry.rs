//! Interaction and composite registry health check

use crate::actions::{InputRegistry, NameAndParameters};
use crate::config::InputSettings;
use crate::health::check::{CheckResult, Findings, SystemCheck};

const INTERACTIONS: [&str; 6] = ["press", "hold", "tap", "slowTap", "multiTap", "swipe"];
const COMPOSITES: [&str; 4] = ["2DVector", "Dpad", "1DAxis", "ButtonWithOneModifier"];

/// Checks that every built-in type is registered and can be instantiated
pub struct RegistryCheck;

impl RegistryCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RegistryCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for RegistryCheck {
    fn name(&self) -> &'static str {
        "Registry"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates the built-in interactions and composites")
    }

    fn check(&self, settings: &InputSettings) -> CheckResult {
        let mut findings = Findings::new();
        let registry = InputRegistry::with_defaults();

        for name in INTERACTIONS {
            let created = NameAndParameters::parse(name)
                .and_then(|params| registry.create_interaction(&params, settings));
            match created {
                Ok(interaction) => findings.ok(format!("Interaction '{}'", interaction.name())),
                Err(e) => findings.fail(format!("Interaction '{name}': {e}")),
            }
        }

        for name in COMPOSITES {
            let created = NameAndParameters::parse(name)
                .and_then(|params| registry.create_composite(&params));
            match created {
                Ok(composite) => findings.ok(format!(
                    "Composite '{name}' with slots {:?}",
                    composite
                        .slots()
                        .into_iter()
                        .map(|(slot, _)| slot)
                        .collect::<Vec<_>>()
                )),
                Err(e) => findings.fail(format!("Composite '{name}': {e}")),
            }
        }

        findings.finish(format!(
            "{} interactions, {} composites",
            INTERACTIONS.len(),
            COMPOSITES.len()
        ))
    }
}
