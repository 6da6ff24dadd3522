//! Edge-detected button state

/// Button press state with edge detection
///
/// Derived from two snapshots of the same control: the state the current
/// update observes and the state it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Released,
    /// Pressed this update (edge)
    JustPressed,
    /// Held down (multiple updates)
    Pressed,
    /// Released this update (edge)
    JustReleased,
}

impl ButtonState {
    /// State of a button that was `was_down` and is now `is_down`
    pub fn from_edge(was_down: bool, is_down: bool) -> Self {
        match (was_down, is_down) {
            (false, true) => Self::JustPressed,
            (true, true) => Self::Pressed,
            (true, false) => Self::JustReleased,
            (false, false) => Self::Released,
        }
    }

    /// State of a button that did not change this update
    pub fn steady(is_down: bool) -> Self {
        Self::from_edge(is_down, is_down)
    }

    /// Returns true if button is currently down (just pressed or held)
    pub fn is_down(self) -> bool {
        matches!(self, Self::JustPressed | Self::Pressed)
    }

    pub fn is_just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }

    pub fn is_just_released(self) -> bool {
        matches!(self, Self::JustReleased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        assert_eq!(ButtonState::from_edge(false, true), ButtonState::JustPressed);
        assert_eq!(ButtonState::from_edge(true, false), ButtonState::JustReleased);
        assert_eq!(ButtonState::steady(true), ButtonState::Pressed);
        assert_eq!(ButtonState::steady(false), ButtonState::Released);
        assert!(ButtonState::JustPressed.is_down());
        assert!(!ButtonState::JustReleased.is_down());
    }
}
