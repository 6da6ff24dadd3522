//! Error types for the input pipeline.
//!
//! Errors fall into four families. Configuration errors are reported and the
//! offending binding or event is dropped. Resolution errors abort the
//! resolution of one action map. Capacity errors are fatal at process level.
//! Lookup errors come from API calls naming something that does not exist.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::actions::composites::SlotError;
use crate::device::{DeviceId, FourCc};

/// The main error type for input system operations.
#[derive(Error, Debug)]
pub enum InputError {
    /// Interaction name not present in the registry
    #[error("Unknown interaction '{name}'")]
    UnknownInteraction { name: String },

    /// Composite name not present in the registry
    #[error("Unknown composite '{name}'")]
    UnknownComposite { name: String },

    /// A composite rejected a slot assignment
    #[error("Composite '{composite}' rejected part binding {binding}: {source}")]
    CompositeSlot {
        composite: String,
        binding: usize,
        #[source]
        source: SlotError,
    },

    /// Event state format differs from the device's declared format
    #[error("Device {device} expects state format '{expected}' but event carries '{actual}'")]
    StateFormatMismatch {
        device: DeviceId,
        expected: FourCc,
        actual: FourCc,
    },

    /// Multi-bit field that is not byte aligned, or an empty region
    #[error(
        "Unsupported monitor region: {size_in_bits} bits at byte {byte_offset}, bit {bit_offset}"
    )]
    UnsupportedMonitorRegion {
        byte_offset: u32,
        bit_offset: u32,
        size_in_bits: u32,
    },

    /// Malformed or unknown `name(param=value)` parameter
    #[error("Invalid parameter '{parameter}' for '{owner}': {message}")]
    InvalidParameter {
        owner: String,
        parameter: String,
        message: String,
    },

    /// Control path could not be parsed
    #[error("Invalid control path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// A composite part matched more than one control
    #[error("Composite part binding {binding} ('{path}') resolved to {count} controls, expected one")]
    CompositePartResolvedToMultipleControls {
        binding: usize,
        path: String,
        count: usize,
    },

    /// A composite part has no slot name
    #[error("Composite part binding {binding} has no name")]
    UnnamedCompositePart { binding: usize },

    /// A part binding appears without a preceding composite binding
    #[error("Composite part binding {binding} does not follow a composite binding")]
    CompositePartOutsideComposite { binding: usize },

    /// State memory could not be reserved
    #[error("Failed to allocate {bytes} bytes of device state memory")]
    BufferAllocation {
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("Unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("Unknown action map '{0}'")]
    UnknownActionMap(String),

    #[error("Binding index {binding} is out of range for action map '{map}'")]
    UnknownBinding { map: String, binding: usize },

    #[error("Action map '{map}' has no resolved action '{action}'")]
    UnknownAction { map: String, action: String },

    #[error("Device {device} has no control '{path}'")]
    UnknownControl { device: DeviceId, path: String },

    /// Settings file or environment could not be loaded
    #[error("Failed to load input settings: {0}")]
    Settings(#[from] config::ConfigError),
}

/// Coarse classification used to apply the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reported, offending item dropped, processing continues
    Configuration,
    /// Aborts resolution of one action map
    Resolution,
    /// Fatal, the process cannot continue with inconsistent buffers
    Capacity,
    /// Caller named something that does not exist
    Lookup,
}

/// Standard Result type for input system operations.
pub type Result<T> = std::result::Result<T, InputError>;

impl InputError {
    /// Classifies this error for propagation decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownInteraction { .. }
            | Self::UnknownComposite { .. }
            | Self::CompositeSlot { .. }
            | Self::StateFormatMismatch { .. }
            | Self::UnsupportedMonitorRegion { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidPath { .. }
            | Self::Settings(_) => ErrorKind::Configuration,
            Self::CompositePartResolvedToMultipleControls { .. }
            | Self::UnnamedCompositePart { .. }
            | Self::CompositePartOutsideComposite { .. } => ErrorKind::Resolution,
            Self::BufferAllocation { .. } => ErrorKind::Capacity,
            Self::UnknownDevice(_)
            | Self::UnknownActionMap(_)
            | Self::UnknownBinding { .. }
            | Self::UnknownAction { .. }
            | Self::UnknownControl { .. } => ErrorKind::Lookup,
        }
    }

    /// Create an InvalidParameter error
    pub fn invalid_parameter(
        owner: impl Into<String>,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            owner: owner.into(),
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidPath error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error should stop the process
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = InputError::UnknownInteraction {
            name: "wiggle".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = InputError::UnnamedCompositePart { binding: 3 };
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(!err.is_fatal());

        let err = InputError::UnknownDevice(DeviceId(7));
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_capacity_is_fatal() {
        let source = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let err = InputError::BufferAllocation {
            bytes: usize::MAX,
            source,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("allocate"));
    }

    #[test]
    fn test_error_messages() {
        let err = InputError::invalid_parameter("hold", "duration", "expected a number");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'duration' for 'hold': expected a number"
        );

        let err = InputError::CompositePartResolvedToMultipleControls {
            binding: 2,
            path: "*/up".to_string(),
            count: 2,
        };
        assert!(err.to_string().contains("resolved to 2 controls"));
    }
}
