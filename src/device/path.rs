//! Control path matching
//!
//! Supported forms, all compared case-insensitively:
//!
//! ```text
//! <Gamepad>/buttonSouth      controls on devices using the Gamepad layout
//! /pad1/dpad/up              controls on the device named pad1
//! {Player1}/buttonSouth      controls on devices tagged with a usage
//! */buttonSouth              controls on any device
//! <Gamepad>/dpad/*           any child of dpad
//! ```

use std::str::FromStr;

use super::{ControlTree, Device};
use crate::error::{InputError, Result};

/// Which devices a path applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMatcher {
    Any,
    Layout(String),
    Name(String),
    Usage(String),
}

impl DeviceMatcher {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            Self::Any => true,
            Self::Layout(layout) => device.layout().eq_ignore_ascii_case(layout),
            Self::Name(name) => device.name().eq_ignore_ascii_case(name),
            Self::Usage(usage) => device.has_usage(usage),
        }
    }
}

/// A parsed control path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPath {
    device: DeviceMatcher,
    segments: Vec<String>,
}

impl ControlPath {
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.trim();
        let (device, rest) = if let Some(inner) = path.strip_prefix('<') {
            let (layout, rest) = inner
                .split_once('>')
                .ok_or_else(|| InputError::invalid_path(path, "missing '>'"))?;
            (DeviceMatcher::Layout(layout.to_string()), rest)
        } else if let Some(inner) = path.strip_prefix('{') {
            let (usage, rest) = inner
                .split_once('}')
                .ok_or_else(|| InputError::invalid_path(path, "missing '}'"))?;
            (DeviceMatcher::Usage(usage.to_string()), rest)
        } else if let Some(inner) = path.strip_prefix('/') {
            let (name, rest) = match inner.find('/') {
                Some(i) => inner.split_at(i),
                None => (inner, ""),
            };
            let device = if name == "*" {
                DeviceMatcher::Any
            } else {
                DeviceMatcher::Name(name.to_string())
            };
            (device, rest)
        } else if let Some(rest) = path.strip_prefix('*') {
            (DeviceMatcher::Any, rest)
        } else {
            return Err(InputError::invalid_path(
                path,
                "expected '<layout>', '{usage}', '/name' or '*' at start",
            ));
        };

        if let DeviceMatcher::Layout(s) | DeviceMatcher::Usage(s) | DeviceMatcher::Name(s) = &device
            && s.is_empty()
        {
            return Err(InputError::invalid_path(path, "empty device specifier"));
        }

        if !rest.is_empty() && !rest.starts_with('/') {
            return Err(InputError::invalid_path(path, "expected '/' after device"));
        }

        let segments: Vec<String> = rest
            .split('/')
            .skip(1)
            .map(str::to_string)
            .collect();
        if segments.iter().any(String::is_empty) {
            return Err(InputError::invalid_path(path, "empty path segment"));
        }

        Ok(Self { device, segments })
    }

    pub fn device(&self) -> &DeviceMatcher {
        &self.device
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn matches_device(&self, device: &Device) -> bool {
        self.device.matches(device)
    }

    /// Controls in `tree` matching the path segments, in tree order
    pub fn match_controls(&self, tree: &ControlTree) -> Vec<usize> {
        let Some((first, rest)) = self.segments.split_first() else {
            return Vec::new();
        };

        let mut candidates: Vec<usize> = tree
            .roots()
            .filter(|&i| segment_matches(first, &tree.nodes()[i].name))
            .collect();

        for segment in rest {
            candidates = candidates
                .iter()
                .flat_map(|&parent| tree.nodes()[parent].children.iter().copied())
                .filter(|&child| segment_matches(segment, &tree.nodes()[child].name))
                .collect();
        }

        candidates.sort_unstable();
        candidates
    }

    /// Every `(device index, control index)` the path matches, devices in order
    pub fn resolve(&self, devices: &[Device]) -> Vec<(usize, usize)> {
        devices
            .iter()
            .enumerate()
            .filter(|(_, d)| self.matches_device(d))
            .flat_map(|(device_index, d)| {
                self.match_controls(d.controls())
                    .into_iter()
                    .map(move |control| (device_index, control))
            })
            .collect()
    }
}

impl FromStr for ControlPath {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn segment_matches(pattern: &str, name: &str) -> bool {
    pattern == "*" || pattern.eq_ignore_ascii_case(name)
}
