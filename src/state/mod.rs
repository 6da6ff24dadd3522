//! Per-device, per-update-pass state memory
//!
//! Every enabled update pass (dynamic, fixed, editor) owns one contiguous
//! allocation holding a front and a back copy of every device's state block,
//! concatenated by device index. Before-render passes have no buffers of their
//! own; they read and write the dynamic and fixed buffers.
//!
//! # Architecture
//!
//! ```text
//! StateBuffers
//!   ├── Dynamic: DoubleBuffers [ front half | back half ]
//!   ├── Fixed:   DoubleBuffers [ front half | back half ]
//!   └── Editor:  DoubleBuffers [ front half | back half ]
//!
//! each half: [ device 0 | device 1 | ... ]   (4-byte aligned blocks)
//! ```

mod buffers;
mod button;
mod view;

use bitflags::bitflags;
use enum_map::Enum;
use serde::{Deserialize, Serialize};

pub use buffers::{DoubleBuffers, StateBuffers, align_state_size};
pub use button::ButtonState;
pub use view::{StateView, StateViewMut};

/// One of the independent ticks that observe device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateType {
    /// Variable-step pass, once per rendered frame
    Dynamic,
    /// Fixed-step simulation pass
    Fixed,
    /// Late pass right before rendering, restricted to opted-in devices
    BeforeRender,
    /// Tooling pass, isolated from gameplay buffers
    Editor,
}

bitflags! {
    /// Set of update passes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UpdateMask: u32 {
        const DYNAMIC = 1 << 0;
        const FIXED = 1 << 1;
        const BEFORE_RENDER = 1 << 2;
        const EDITOR = 1 << 3;
    }
}

impl UpdateType {
    pub const ALL: [UpdateType; 4] = [
        UpdateType::Dynamic,
        UpdateType::Fixed,
        UpdateType::BeforeRender,
        UpdateType::Editor,
    ];

    /// The mask bit for this pass
    pub fn mask(self) -> UpdateMask {
        match self {
            Self::Dynamic => UpdateMask::DYNAMIC,
            Self::Fixed => UpdateMask::FIXED,
            Self::BeforeRender => UpdateMask::BEFORE_RENDER,
            Self::Editor => UpdateMask::EDITOR,
        }
    }

    /// Whether this pass owns a double buffer
    pub fn has_buffers(self) -> bool {
        !matches!(self, Self::BeforeRender)
    }

    /// Lower-case name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dynamic => "dynamic",
            Self::Fixed => "fixed",
            Self::BeforeRender => "beforeRender",
            Self::Editor => "editor",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
