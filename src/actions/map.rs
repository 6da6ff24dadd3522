//! Declarative action maps

use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-insensitive name used for action lookups
#[derive(Debug, Clone)]
pub struct InternedString {
    original: String,
    lower: String,
}

impl InternedString {
    pub fn new(text: impl Into<String>) -> Self {
        let original = text.into();
        let lower = original.to_lowercase();
        Self { original, lower }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Compares against plain text, ignoring case
    pub fn matches(&self, text: &str) -> bool {
        self.lower == text.to_lowercase()
    }
}

impl PartialEq for InternedString {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower
    }
}

impl Eq for InternedString {}

impl Hash for InternedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.hash(state);
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl From<&str> for InternedString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub name: InternedString,
    /// Re-signals Performed every pass while performed
    pub continuous: bool,
}

/// One entry of a map's flat binding list
///
/// Composite bindings name the composite type in `path` and are followed by
/// their part bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingDescriptor {
    pub action: String,
    pub path: String,
    pub override_path: Option<String>,
    pub interactions: String,
    /// Slot name for composite parts
    pub name: Option<String>,
    pub is_composite: bool,
    pub is_part_of_composite: bool,
}

impl BindingDescriptor {
    /// Plain binding of `path` to `action`
    pub fn new(action: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            path: path.into(),
            override_path: None,
            interactions: String::new(),
            name: None,
            is_composite: false,
            is_part_of_composite: false,
        }
    }

    /// Composite head, e.g. `composite("Move", "2DVector(mode=digital)")`
    pub fn composite(action: impl Into<String>, composite: impl Into<String>) -> Self {
        Self {
            is_composite: true,
            ..Self::new(action, composite)
        }
    }

    /// Part binding filling slot `name` of the preceding composite
    pub fn part(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_part_of_composite: true,
            ..Self::new("", path)
        }
    }

    pub fn with_interactions(mut self, interactions: impl Into<String>) -> Self {
        self.interactions = interactions.into();
        self
    }

    pub fn with_override(mut self, path: impl Into<String>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override path if set, otherwise the default path
    pub fn effective_path(&self) -> &str {
        self.override_path.as_deref().unwrap_or(&self.path)
    }
}

/// Named set of actions and the flat list of bindings that drive them
#[derive(Debug, Clone)]
pub struct ActionMap {
    name: String,
    actions: Vec<ActionDescriptor>,
    bindings: Vec<BindingDescriptor>,
}

impl ActionMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Builder method to add an action
    pub fn with_action(mut self, name: &str) -> Self {
        self.add_action(name, false);
        self
    }

    /// Builder method to add a continuous action
    pub fn with_continuous_action(mut self, name: &str) -> Self {
        self.add_action(name, true);
        self
    }

    pub fn with_binding(mut self, binding: BindingDescriptor) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn add_action(&mut self, name: &str, continuous: bool) -> usize {
        self.actions.push(ActionDescriptor {
            name: InternedString::new(name),
            continuous,
        });
        self.actions.len() - 1
    }

    pub fn add_binding(&mut self, binding: BindingDescriptor) -> usize {
        self.bindings.push(binding);
        self.bindings.len() - 1
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    pub fn bindings(&self) -> &[BindingDescriptor] {
        &self.bindings
    }

    pub fn action_index(&self, name: &str) -> Option<usize> {
        let name = InternedString::new(name);
        self.actions.iter().position(|a| a.name == name)
    }

    /// Replaces or clears a binding's override path
    pub fn set_binding_override(&mut self, binding: usize, path: Option<String>) -> bool {
        match self.bindings.get_mut(binding) {
            Some(b) => {
                b.override_path = path;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interned_string_ignores_case() {
        let a = InternedString::new("Jump");
        assert_eq!(a, InternedString::new("JUMP"));
        assert!(a.matches("jump"));
        assert_eq!(a.as_str(), "Jump");
    }

    #[test]
    fn test_action_lookup() {
        let map = ActionMap::new("gameplay")
            .with_action("Jump")
            .with_continuous_action("Move");
        assert_eq!(map.action_index("jump"), Some(0));
        assert_eq!(map.action_index("MOVE"), Some(1));
        assert!(map.actions()[1].continuous);
        assert_eq!(map.action_index("fire"), None);
    }

    #[test]
    fn test_override_path() {
        let mut map = ActionMap::new("gameplay")
            .with_binding(BindingDescriptor::new("Jump", "<Gamepad>/buttonSouth"));
        assert_eq!(map.bindings()[0].effective_path(), "<Gamepad>/buttonSouth");

        assert!(map.set_binding_override(0, Some("<Gamepad>/buttonEast".into())));
        assert_eq!(map.bindings()[0].effective_path(), "<Gamepad>/buttonEast");
        assert!(!map.set_binding_override(5, None));
    }

    #[test]
    fn test_composite_descriptors() {
        let head = BindingDescriptor::composite("Move", "2DVector");
        assert!(head.is_composite && !head.is_part_of_composite);
        let part = BindingDescriptor::part("up", "<Gamepad>/dpad/up");
        assert!(part.is_part_of_composite);
        assert_eq!(part.name.as_deref(), Some("up"));
    }
}
