//! Actions, bindings and the machinery that drives them
//!
//! # Architecture
//!
//! ```text
//! ActionMap (descriptors)
//!   └── BindingResolver ──> ResolvedTables (flat arrays, index ranges)
//!                             └── ActionStateMachine
//!                                   ├── Interaction objects (per binding)
//!                                   ├── CompositeBinding objects
//!                                   └── TimeoutQueue
//! ```
//!
//! Everything after resolution refers to bindings, controls, interactions
//! and composites by index into the resolved tables.

pub mod composites;
pub mod interactions;
mod map;
mod params;
mod registry;
mod resolver;
mod state;
mod timeout;

use std::fmt;

use crate::device::ControlValue;

pub use map::{ActionDescriptor, ActionMap, BindingDescriptor, InternedString};
pub use params::{NameAndParameters, NamedValue};
pub use registry::{CompositeFactory, InputRegistry, InteractionFactory};
pub use resolver::{
    ActionInfo, BindingResolver, BindingState, CompositeState, InteractionState, MapIndices,
    ResolvedControl, ResolvedTables, TablesLayout,
};
pub use state::{ActionChange, ActionState, ActionStateMachine, TriggerState};
pub use timeout::{TimeoutEntry, TimeoutQueue};

/// Phase of an action or interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionPhase {
    #[default]
    Waiting,
    Started,
    Performed,
    Cancelled,
}

impl ActionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Started => "started",
            Self::Performed => "performed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a control in the resolved control table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle(pub usize);

/// Reads the current value of a resolved control
pub trait ControlReader {
    fn read(&self, control: &ResolvedControl) -> ControlValue;
}
