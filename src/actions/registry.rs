//! Name to factory tables for interactions and composites

use indexmap::IndexMap;
use tracing::debug;

use super::NameAndParameters;
use super::composites::{
    AxisComposite, ButtonWithModifierComposite, CompositeBinding, Vector2Composite,
};
use super::interactions::{
    HoldInteraction, Interaction, MultiTapInteraction, PressInteraction, SlowTapInteraction,
    SwipeInteraction, TapInteraction,
};
use crate::config::InputSettings;
use crate::error::{InputError, Result};

pub type InteractionFactory =
    fn(&NameAndParameters, &InputSettings) -> Result<Box<dyn Interaction>>;
pub type CompositeFactory = fn(&NameAndParameters) -> Result<Box<dyn CompositeBinding>>;

/// Registered interaction and composite types, keyed by lower-cased name
///
/// Owned by whoever resolves bindings; there is no process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    interactions: IndexMap<String, InteractionFactory>,
    composites: IndexMap<String, CompositeFactory>,
}

impl InputRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in interactions and composites
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_interaction("press", PressInteraction::create);
        registry.register_interaction("hold", HoldInteraction::create);
        registry.register_interaction("tap", TapInteraction::create);
        registry.register_interaction("slowTap", SlowTapInteraction::create);
        registry.register_interaction("multiTap", MultiTapInteraction::create);
        registry.register_interaction("swipe", SwipeInteraction::create);

        registry.register_composite("2DVector", Vector2Composite::create);
        registry.register_composite("Dpad", Vector2Composite::create);
        registry.register_composite("1DAxis", AxisComposite::create);
        registry.register_composite("ButtonWithOneModifier", ButtonWithModifierComposite::create);
        registry
    }

    /// Adds or replaces an interaction type; returns true if it replaced one
    pub fn register_interaction(&mut self, name: &str, factory: InteractionFactory) -> bool {
        debug!(name, "Registering interaction");
        self.interactions
            .insert(name.to_lowercase(), factory)
            .is_some()
    }

    /// Adds or replaces a composite type; returns true if it replaced one
    pub fn register_composite(&mut self, name: &str, factory: CompositeFactory) -> bool {
        debug!(name, "Registering composite");
        self.composites
            .insert(name.to_lowercase(), factory)
            .is_some()
    }

    pub fn has_interaction(&self, name: &str) -> bool {
        self.interactions.contains_key(&name.to_lowercase())
    }

    pub fn has_composite(&self, name: &str) -> bool {
        self.composites.contains_key(&name.to_lowercase())
    }

    /// Registered interaction names in registration order
    pub fn interaction_names(&self) -> impl Iterator<Item = &str> {
        self.interactions.keys().map(String::as_str)
    }

    /// Registered composite names in registration order
    pub fn composite_names(&self) -> impl Iterator<Item = &str> {
        self.composites.keys().map(String::as_str)
    }

    /// Instantiates the interaction named in `params`
    pub fn create_interaction(
        &self,
        params: &NameAndParameters,
        settings: &InputSettings,
    ) -> Result<Box<dyn Interaction>> {
        let factory = self
            .interactions
            .get(&params.name.to_lowercase())
            .ok_or_else(|| InputError::UnknownInteraction {
                name: params.name.clone(),
            })?;
        factory(params, settings)
    }

    /// Instantiates the composite named in `params`
    pub fn create_composite(&self, params: &NameAndParameters) -> Result<Box<dyn CompositeBinding>> {
        let factory = self
            .composites
            .get(&params.name.to_lowercase())
            .ok_or_else(|| InputError::UnknownComposite {
                name: params.name.clone(),
            })?;
        factory(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_registered() {
        let registry = InputRegistry::with_defaults();
        for name in ["press", "hold", "tap", "slowtap", "multitap", "swipe"] {
            assert!(registry.has_interaction(name), "{name}");
        }
        for name in ["2dvector", "dpad", "1daxis", "buttonwithonemodifier"] {
            assert!(registry.has_composite(name), "{name}");
        }
        assert_eq!(registry.interaction_names().next(), Some("press"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = InputRegistry::with_defaults();
        let settings = InputSettings::default();
        let params = NameAndParameters::parse("HOLD(duration=1)").unwrap();
        let hold = registry.create_interaction(&params, &settings).unwrap();
        assert_eq!(hold.name(), "hold");
    }

    #[test]
    fn test_unknown_names() {
        let registry = InputRegistry::new();
        let settings = InputSettings::default();
        let params = NameAndParameters::parse("hold").unwrap();
        assert!(matches!(
            registry.create_interaction(&params, &settings),
            Err(InputError::UnknownInteraction { .. })
        ));
        let params = NameAndParameters::parse("2DVector").unwrap();
        assert!(matches!(
            registry.create_composite(&params),
            Err(InputError::UnknownComposite { .. })
        ));
    }

    #[test]
    fn test_replacing_a_factory() {
        let mut registry = InputRegistry::with_defaults();
        assert!(registry.register_interaction("Tap", TapInteraction::create));
        assert!(!registry.register_interaction("myTap", TapInteraction::create));
    }
}
