//! Composite bindings synthesizing one value from several part bindings

use std::fmt;

use glam::Vec2;
use thiserror::Error;

use super::{ControlHandle, ControlReader, NameAndParameters, ResolvedControl};
use crate::device::ControlValue;
use crate::error::{InputError, Result};

/// Why a composite refused a part binding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("no slot named '{0}'")]
    Unknown(String),
    #[error("slot '{0}' is already bound")]
    AlreadyBound(String),
}

/// Read access to a composite's part controls
pub struct CompositeContext<'a> {
    controls: &'a [ResolvedControl],
    reader: &'a dyn ControlReader,
    press_point: f32,
}

impl<'a> CompositeContext<'a> {
    pub fn new(
        controls: &'a [ResolvedControl],
        reader: &'a dyn ControlReader,
        press_point: f32,
    ) -> Self {
        Self {
            controls,
            reader,
            press_point,
        }
    }

    /// Value of a part control; unbound handles read as zero
    pub fn value(&self, handle: ControlHandle) -> ControlValue {
        self.controls
            .get(handle.0)
            .map(|c| self.reader.read(c))
            .unwrap_or_default()
    }

    pub fn magnitude(&self, handle: Option<ControlHandle>) -> f32 {
        handle.map_or(0.0, |h| self.value(h).magnitude())
    }

    pub fn is_pressed(&self, handle: Option<ControlHandle>) -> bool {
        handle.is_some() && self.magnitude(handle) >= self.press_point
    }
}

/// A composite type with named slots, each bound to exactly one control
pub trait CompositeBinding: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Binds `control` to the slot called `slot` (case-insensitive)
    fn set_slot(&mut self, slot: &str, control: ControlHandle) -> std::result::Result<(), SlotError>;

    /// Called once the part chain has ended
    fn finish(&mut self) {}

    /// Slot names and their current bindings
    fn slots(&self) -> Vec<(&'static str, Option<ControlHandle>)>;

    fn read_value(&self, ctx: &CompositeContext<'_>) -> ControlValue;

    fn magnitude(&self, ctx: &CompositeContext<'_>) -> f32 {
        self.read_value(ctx).magnitude()
    }
}

fn bind(
    slot: &mut Option<ControlHandle>,
    name: &str,
    control: ControlHandle,
) -> std::result::Result<(), SlotError> {
    if slot.is_some() {
        return Err(SlotError::AlreadyBound(name.to_string()));
    }
    *slot = Some(control);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vector2Mode {
    /// Digital parts, result normalized to unit length
    #[default]
    DigitalNormalized,
    /// Digital parts, diagonals keep length sqrt(2)
    Digital,
    /// Part magnitudes used as is
    Analog,
}

/// Four directional parts combined into a 2D vector
#[derive(Debug, Default)]
pub struct Vector2Composite {
    up: Option<ControlHandle>,
    down: Option<ControlHandle>,
    left: Option<ControlHandle>,
    right: Option<ControlHandle>,
    mode: Vector2Mode,
}

impl Vector2Composite {
    pub fn new(mode: Vector2Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn create(params: &NameAndParameters) -> Result<Box<dyn CompositeBinding>> {
        params.expect_only(&["mode"])?;
        let mode = match params.get("mode") {
            None => Vector2Mode::DigitalNormalized,
            Some(m) if m.eq_ignore_ascii_case("digitalNormalized") || m == "0" => {
                Vector2Mode::DigitalNormalized
            }
            Some(m) if m.eq_ignore_ascii_case("digital") || m == "1" => Vector2Mode::Digital,
            Some(m) if m.eq_ignore_ascii_case("analog") || m == "2" => Vector2Mode::Analog,
            Some(m) => {
                return Err(InputError::invalid_parameter(
                    &params.name,
                    "mode",
                    format!("unknown mode '{m}'"),
                ));
            }
        };
        Ok(Box::new(Self::new(mode)))
    }
}

impl CompositeBinding for Vector2Composite {
    fn name(&self) -> &'static str {
        "2DVector"
    }

    fn set_slot(&mut self, slot: &str, control: ControlHandle) -> std::result::Result<(), SlotError> {
        match slot.to_ascii_lowercase().as_str() {
            "up" => bind(&mut self.up, "up", control),
            "down" => bind(&mut self.down, "down", control),
            "left" => bind(&mut self.left, "left", control),
            "right" => bind(&mut self.right, "right", control),
            _ => Err(SlotError::Unknown(slot.to_string())),
        }
    }

    fn slots(&self) -> Vec<(&'static str, Option<ControlHandle>)> {
        vec![
            ("up", self.up),
            ("down", self.down),
            ("left", self.left),
            ("right", self.right),
        ]
    }

    fn read_value(&self, ctx: &CompositeContext<'_>) -> ControlValue {
        let part = |handle: Option<ControlHandle>| match self.mode {
            Vector2Mode::Analog => ctx.magnitude(handle),
            _ if ctx.is_pressed(handle) => 1.0,
            _ => 0.0,
        };
        let value = Vec2::new(
            part(self.right) - part(self.left),
            part(self.up) - part(self.down),
        );
        match self.mode {
            Vector2Mode::DigitalNormalized => ControlValue::Vector2(value.normalize_or_zero()),
            _ => ControlValue::Vector2(value),
        }
    }
}

/// Negative and positive parts combined into one axis
#[derive(Debug)]
pub struct AxisComposite {
    negative: Option<ControlHandle>,
    positive: Option<ControlHandle>,
    min_value: f32,
    max_value: f32,
}

impl Default for AxisComposite {
    fn default() -> Self {
        Self {
            negative: None,
            positive: None,
            min_value: -1.0,
            max_value: 1.0,
        }
    }
}

impl AxisComposite {
    pub fn create(params: &NameAndParameters) -> Result<Box<dyn CompositeBinding>> {
        params.expect_only(&["minValue", "maxValue"])?;
        let defaults = Self::default();
        let min_value = params.f32("minValue")?.unwrap_or(defaults.min_value);
        let max_value = params.f32("maxValue")?.unwrap_or(defaults.max_value);
        if min_value >= max_value {
            return Err(InputError::invalid_parameter(
                &params.name,
                "minValue",
                "must be below maxValue",
            ));
        }
        Ok(Box::new(Self {
            min_value,
            max_value,
            ..defaults
        }))
    }

    fn mid_point(&self) -> f32 {
        (self.min_value + self.max_value) / 2.0
    }
}

impl CompositeBinding for AxisComposite {
    fn name(&self) -> &'static str {
        "1DAxis"
    }

    fn set_slot(&mut self, slot: &str, control: ControlHandle) -> std::result::Result<(), SlotError> {
        match slot.to_ascii_lowercase().as_str() {
            "negative" => bind(&mut self.negative, "negative", control),
            "positive" => bind(&mut self.positive, "positive", control),
            _ => Err(SlotError::Unknown(slot.to_string())),
        }
    }

    fn slots(&self) -> Vec<(&'static str, Option<ControlHandle>)> {
        vec![("negative", self.negative), ("positive", self.positive)]
    }

    fn read_value(&self, ctx: &CompositeContext<'_>) -> ControlValue {
        let negative = ctx.magnitude(self.negative).min(1.0);
        let positive = ctx.magnitude(self.positive).min(1.0);
        let mid = self.mid_point();

        // Both sides actuated cancel out
        let value = match (negative > 0.0, positive > 0.0) {
            (true, true) | (false, false) => mid,
            (false, true) => mid + (self.max_value - mid) * positive,
            (true, false) => mid + (self.min_value - mid) * negative,
        };
        ControlValue::Float(value)
    }

    fn magnitude(&self, ctx: &CompositeContext<'_>) -> f32 {
        let mid = self.mid_point();
        let half_range = self.max_value - mid;
        (self.read_value(ctx).as_f32() - mid).abs() / half_range
    }
}

/// A button that only counts while a modifier is held
#[derive(Debug, Default)]
pub struct ButtonWithModifierComposite {
    modifier: Option<ControlHandle>,
    button: Option<ControlHandle>,
}

impl ButtonWithModifierComposite {
    pub fn create(params: &NameAndParameters) -> Result<Box<dyn CompositeBinding>> {
        params.expect_only(&[])?;
        Ok(Box::new(Self::default()))
    }
}

impl CompositeBinding for ButtonWithModifierComposite {
    fn name(&self) -> &'static str {
        "ButtonWithOneModifier"
    }

    fn set_slot(&mut self, slot: &str, control: ControlHandle) -> std::result::Result<(), SlotError> {
        match slot.to_ascii_lowercase().as_str() {
            "modifier" => bind(&mut self.modifier, "modifier", control),
            "button" => bind(&mut self.button, "button", control),
            _ => Err(SlotError::Unknown(slot.to_string())),
        }
    }

    fn slots(&self) -> Vec<(&'static str, Option<ControlHandle>)> {
        vec![("modifier", self.modifier), ("button", self.button)]
    }

    fn read_value(&self, ctx: &CompositeContext<'_>) -> ControlValue {
        if ctx.is_pressed(self.modifier) {
            ControlValue::Float(ctx.magnitude(self.button))
        } else {
            ControlValue::Float(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceId, StateBlock};

    /// Reads control `i` as the i-th stored value
    struct FixedValues(Vec<f32>);

    impl ControlReader for FixedValues {
        fn read(&self, control: &ResolvedControl) -> ControlValue {
            ControlValue::Float(self.0[control.control])
        }
    }

    fn controls(n: usize) -> Vec<ResolvedControl> {
        (0..n)
            .map(|i| ResolvedControl {
                device: DeviceId(1),
                device_index: 0,
                control: i,
                block: StateBlock::bit(0, i as u32),
            })
            .collect()
    }

    fn dpad(mode: Vector2Mode) -> Vector2Composite {
        let mut composite = Vector2Composite::new(mode);
        for (i, slot) in ["up", "down", "left", "right"].iter().enumerate() {
            composite.set_slot(slot, ControlHandle(i)).unwrap();
        }
        composite
    }

    #[test]
    fn test_vector2_normalizes_diagonal() {
        let controls = controls(4);
        let reader = FixedValues(vec![1.0, 0.0, 0.0, 1.0]);
        let ctx = CompositeContext::new(&controls, &reader, 0.5);

        let value = dpad(Vector2Mode::DigitalNormalized).read_value(&ctx).as_vec2();
        assert!((value.x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((value.y - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);

        let raw = dpad(Vector2Mode::Digital).read_value(&ctx).as_vec2();
        assert_eq!(raw, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_vector2_slot_errors() {
        let mut composite = Vector2Composite::default();
        assert_eq!(
            composite.set_slot("north", ControlHandle(0)),
            Err(SlotError::Unknown("north".into()))
        );
        composite.set_slot("UP", ControlHandle(0)).unwrap();
        assert_eq!(
            composite.set_slot("up", ControlHandle(1)),
            Err(SlotError::AlreadyBound("up".into()))
        );
    }

    #[test]
    fn test_vector2_mode_parameter() {
        let params = NameAndParameters::parse("2DVector(mode=sideways)").unwrap();
        assert!(Vector2Composite::create(&params).is_err());
        let params = NameAndParameters::parse("2DVector(mode=digital)").unwrap();
        assert!(Vector2Composite::create(&params).is_ok());
    }

    #[test]
    fn test_axis_values() {
        let controls = controls(2);
        let mut axis = AxisComposite::default();
        axis.set_slot("negative", ControlHandle(0)).unwrap();
        axis.set_slot("positive", ControlHandle(1)).unwrap();

        let read = |values: Vec<f32>| {
            let reader = FixedValues(values);
            let ctx = CompositeContext::new(&controls, &reader, 0.5);
            (axis.read_value(&ctx).as_f32(), axis.magnitude(&ctx))
        };
        assert_eq!(read(vec![0.0, 1.0]), (1.0, 1.0));
        assert_eq!(read(vec![1.0, 0.0]), (-1.0, 1.0));
        assert_eq!(read(vec![1.0, 1.0]), (0.0, 0.0));
        assert_eq!(read(vec![0.0, 0.0]), (0.0, 0.0));
    }

    #[test]
    fn test_button_with_modifier() {
        let controls = controls(2);
        let mut composite = ButtonWithModifierComposite::default();
        composite.set_slot("modifier", ControlHandle(0)).unwrap();
        composite.set_slot("button", ControlHandle(1)).unwrap();

        let reader = FixedValues(vec![0.0, 1.0]);
        let ctx = CompositeContext::new(&controls, &reader, 0.5);
        assert_eq!(composite.read_value(&ctx), ControlValue::Float(0.0));

        let reader = FixedValues(vec![1.0, 1.0]);
        let ctx = CompositeContext::new(&controls, &reader, 0.5);
        assert_eq!(composite.read_value(&ctx), ControlValue::Float(1.0));
    }
}
