//! Control trees and typed control values

use glam::Vec2;

use crate::state::StateView;

/// How a control's bits are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFormat {
    /// Single bit, read as 0.0 or 1.0
    Bit,
    /// Unsigned byte normalized to 0..=1
    Byte,
    /// Little-endian f32
    Float,
    /// Two little-endian f32 (x, y)
    Vector2,
    /// Little-endian i32
    Integer,
    /// Interior node spanning its children
    Group,
}

/// Location of a control within its device's state block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateBlock {
    pub byte_offset: u32,
    pub bit_offset: u32,
    pub size_in_bits: u32,
    pub format: ControlFormat,
}

impl StateBlock {
    pub fn bit(byte_offset: u32, bit_offset: u32) -> Self {
        Self {
            byte_offset: byte_offset + bit_offset / 8,
            bit_offset: bit_offset % 8,
            size_in_bits: 1,
            format: ControlFormat::Bit,
        }
    }

    pub fn byte(byte_offset: u32) -> Self {
        Self::whole(byte_offset, 1, ControlFormat::Byte)
    }

    pub fn float(byte_offset: u32) -> Self {
        Self::whole(byte_offset, 4, ControlFormat::Float)
    }

    pub fn vector2(byte_offset: u32) -> Self {
        Self::whole(byte_offset, 8, ControlFormat::Vector2)
    }

    pub fn integer(byte_offset: u32) -> Self {
        Self::whole(byte_offset, 4, ControlFormat::Integer)
    }

    fn whole(byte_offset: u32, bytes: u32, format: ControlFormat) -> Self {
        Self {
            byte_offset,
            bit_offset: 0,
            size_in_bits: bytes * 8,
            format,
        }
    }

    /// First bit covered, relative to the device
    pub fn bit_start(&self) -> u32 {
        self.byte_offset * 8 + self.bit_offset
    }

    /// One past the last bit covered
    pub fn bit_end(&self) -> u32 {
        self.bit_start() + self.size_in_bits
    }

    /// One past the last byte touched
    pub fn byte_end(&self) -> u32 {
        self.bit_end().div_ceil(8)
    }

    /// Reads the control's value out of its device's state
    pub fn read(&self, state: StateView<'_>) -> ControlValue {
        let offset = self.byte_offset as usize;
        match self.format {
            ControlFormat::Bit => {
                let on = state.read_bit(offset, self.bit_offset);
                ControlValue::Float(if on { 1.0 } else { 0.0 })
            }
            ControlFormat::Byte => ControlValue::Float(f32::from(state.read_u8(offset)) / 255.0),
            ControlFormat::Float => ControlValue::Float(state.read::<f32>(offset).unwrap_or(0.0)),
            ControlFormat::Vector2 => {
                let x = state.read::<f32>(offset).unwrap_or(0.0);
                let y = state.read::<f32>(offset + 4).unwrap_or(0.0);
                ControlValue::Vector2(Vec2::new(x, y))
            }
            ControlFormat::Integer => ControlValue::Discrete(state.read::<i32>(offset).unwrap_or(0)),
            ControlFormat::Group => ControlValue::Float(0.0),
        }
    }
}

/// Typed value read from a control or synthesized by a composite
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Float(f32),
    Vector2(Vec2),
    Discrete(i32),
}

impl ControlValue {
    /// Actuation amount, always non-negative
    pub fn magnitude(&self) -> f32 {
        match self {
            Self::Float(v) => v.abs(),
            Self::Vector2(v) => v.length(),
            Self::Discrete(v) => v.unsigned_abs() as f32,
        }
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Float(v) => *v,
            Self::Vector2(v) => v.length(),
            Self::Discrete(v) => *v as f32,
        }
    }

    pub fn as_vec2(&self) -> Vec2 {
        match self {
            Self::Vector2(v) => *v,
            Self::Float(v) => Vec2::new(*v, 0.0),
            Self::Discrete(v) => Vec2::new(*v as f32, 0.0),
        }
    }
}

impl Default for ControlValue {
    fn default() -> Self {
        Self::Float(0.0)
    }
}

/// One node of a control tree
#[derive(Debug, Clone, PartialEq)]
pub struct ControlNode {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub block: StateBlock,
}

/// Named controls of one device, parents before children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlTree {
    nodes: Vec<ControlNode>,
}

impl ControlTree {
    pub fn builder() -> ControlTreeBuilder {
        ControlTreeBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<&ControlNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[ControlNode] {
        &self.nodes
    }

    /// Indices of top-level controls
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Looks up a control by slash-separated name, ignoring case
    pub fn find(&self, path: &str) -> Option<usize> {
        let mut current: Option<usize> = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let found = match current {
                None => self
                    .roots()
                    .find(|&i| self.nodes[i].name.eq_ignore_ascii_case(segment)),
                Some(parent) => self.nodes[parent]
                    .children
                    .iter()
                    .copied()
                    .find(|&i| self.nodes[i].name.eq_ignore_ascii_case(segment)),
            };
            current = Some(found?);
        }
        current
    }

    /// Full slash-separated name of a control
    pub fn path_of(&self, index: usize) -> String {
        let mut parts = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            let Some(node) = self.nodes.get(i) else {
                break;
            };
            parts.push(node.name.as_str());
            current = node.parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Bytes needed to hold every control
    pub fn state_size_in_bytes(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.block.byte_end() as usize)
            .max()
            .unwrap_or(0)
    }
}

/// Builds a [`ControlTree`] from slash-separated paths
///
/// Missing parents are created as group nodes whose block spans their
/// children.
#[derive(Debug, Default)]
pub struct ControlTreeBuilder {
    nodes: Vec<ControlNode>,
}

impl ControlTreeBuilder {
    /// Adds a control at `path` with an explicit state block
    pub fn control(mut self, path: &str, block: StateBlock) -> Self {
        let mut parent: Option<usize> = None;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, groups)) = segments.split_last() else {
            return self;
        };

        for segment in groups {
            parent = Some(self.child_or_group(parent, segment));
        }

        let index = self.nodes.len();
        self.nodes.push(ControlNode {
            name: (*leaf).to_string(),
            parent,
            children: Vec::new(),
            block,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }
        self
    }

    /// Single-bit button
    pub fn button(self, path: &str, byte_offset: u32, bit_offset: u32) -> Self {
        self.control(path, StateBlock::bit(byte_offset, bit_offset))
    }

    /// Byte-sized analog control normalized to 0..=1
    pub fn byte(self, path: &str, byte_offset: u32) -> Self {
        self.control(path, StateBlock::byte(byte_offset))
    }

    pub fn axis(self, path: &str, byte_offset: u32) -> Self {
        self.control(path, StateBlock::float(byte_offset))
    }

    pub fn stick(self, path: &str, byte_offset: u32) -> Self {
        self.control(path, StateBlock::vector2(byte_offset))
    }

    pub fn integer(self, path: &str, byte_offset: u32) -> Self {
        self.control(path, StateBlock::integer(byte_offset))
    }

    fn child_or_group(&mut self, parent: Option<usize>, name: &str) -> usize {
        let existing = self
            .nodes
            .iter()
            .enumerate()
            .find(|(_, n)| n.parent == parent && n.name.eq_ignore_ascii_case(name))
            .map(|(i, _)| i);
        if let Some(index) = existing {
            return index;
        }

        let index = self.nodes.len();
        self.nodes.push(ControlNode {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            block: StateBlock {
                byte_offset: 0,
                bit_offset: 0,
                size_in_bits: 0,
                format: ControlFormat::Group,
            },
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }
        index
    }

    pub fn build(mut self) -> ControlTree {
        // Children always come after their parent, so a reverse walk sees
        // every child's final block before the group that contains it.
        for index in (0..self.nodes.len()).rev() {
            if self.nodes[index].block.format != ControlFormat::Group
                || self.nodes[index].children.is_empty()
            {
                continue;
            }
            let (start, end) = self.nodes[index]
                .children
                .iter()
                .map(|&c| {
                    let b = self.nodes[c].block;
                    (b.byte_offset, b.byte_end())
                })
                .fold((u32::MAX, 0), |(s, e), (cs, ce)| (s.min(cs), e.max(ce)));
            self.nodes[index].block = StateBlock {
                byte_offset: start,
                bit_offset: 0,
                size_in_bits: (end - start) * 8,
                format: ControlFormat::Group,
            };
        }
        ControlTree { nodes: self.nodes }
    }
}
