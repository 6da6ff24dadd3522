//! Input settings
//!
//! Supports multiple profiles (debug, release) with different settings.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InputError, Result};
use crate::state::{UpdateMask, UpdateType};

/// Tunables consumed by interactions, composites and the frame driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// The active profile (debug, release, etc.)
    pub profile: String,
    /// Actuation at which a control counts as pressed
    pub default_button_press_point: f32,
    /// Fraction of the press point below which a pressed control counts as released
    pub button_release_threshold: f32,
    /// Seconds within which a press must be released to count as a tap
    pub default_tap_time: f32,
    /// Minimum seconds a press must last to count as a slow tap
    pub default_slow_tap_time: f32,
    /// Seconds a control must stay actuated for a hold
    pub default_hold_time: f32,
    /// Maximum seconds between taps of a multi-tap
    pub multi_tap_delay_time: f32,
    /// Distance a vector control must travel for a swipe
    pub default_swipe_distance: f32,
    /// Update passes that get their own state buffers
    pub update_passes: Vec<UpdateType>,
    /// Seconds per fixed update pass
    pub fixed_timestep: f32,
    /// Upper bound on fixed passes run for a single frame
    pub max_fixed_steps_per_frame: u32,
}

impl InputSettings {
    /// Loads settings based on the specified profile
    ///
    /// Sources are layered in this order:
    /// 1. config/{profile}.toml
    /// 2. Environment variables with prefix INPUT_ (e.g., INPUT_DEFAULT_HOLD_TIME=0.8)
    ///
    /// Config files are searched for next to the executable first, then in ./config.
    pub fn load(profile: &str) -> Result<Self> {
        let dir = Self::find_config_dir().unwrap_or_else(|| PathBuf::from("config"));
        Self::load_from_dir(&dir, profile)
    }

    /// Loads a profile from an explicit config directory
    pub fn load_from_dir(dir: &Path, profile: &str) -> Result<Self> {
        let profile_path = dir.join(profile);
        let config = Config::builder()
            .add_source(File::from(profile_path.as_path()).required(false))
            .add_source(
                Environment::with_prefix("INPUT")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("update_passes")
                    .try_parsing(true),
            )
            .set_override("profile", profile)?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads settings using the INPUT_PROFILE environment variable,
    /// defaulting to "release"
    pub fn load_from_env() -> Result<Self> {
        let profile = std::env::var("INPUT_PROFILE").unwrap_or_else(|_| "release".to_string());
        Self::load(&profile)
    }

    /// Loads a profile, falling back to built-in values on failure
    pub fn load_or_default(profile: &str) -> Self {
        Self::load(profile).unwrap_or_else(|e| {
            warn!(error = %e, profile, "Failed to load input settings, using defaults");
            Self {
                profile: profile.to_string(),
                ..Self::default()
            }
        })
    }

    fn find_config_dir() -> Option<PathBuf> {
        if let Ok(exe_path) = std::env::current_exe()
            && let Some(exe_dir) = exe_path.parent()
        {
            let config_dir = exe_dir.join("config");
            if config_dir.exists() {
                return Some(config_dir);
            }
        }

        let cwd_config = PathBuf::from("config");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        None
    }

    /// Passes with their own state buffers, as a mask
    pub fn update_mask(&self) -> UpdateMask {
        self.update_passes
            .iter()
            .fold(UpdateMask::empty(), |mask, pass| mask | pass.mask())
    }

    /// Rejects values the interactions and the frame driver cannot work with
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(InputError::invalid_parameter(
                    "settings",
                    name,
                    format!("{value} is outside (0, 1]"),
                ))
            }
        };
        unit("default_button_press_point", self.default_button_press_point)?;
        unit("button_release_threshold", self.button_release_threshold)?;

        for (name, value) in [
            ("default_tap_time", self.default_tap_time),
            ("default_slow_tap_time", self.default_slow_tap_time),
            ("default_hold_time", self.default_hold_time),
            ("multi_tap_delay_time", self.multi_tap_delay_time),
            ("default_swipe_distance", self.default_swipe_distance),
            ("fixed_timestep", self.fixed_timestep),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(InputError::invalid_parameter(
                    "settings",
                    name,
                    format!("{value} must be positive"),
                ));
            }
        }

        if !self.update_passes.iter().any(|p| p.has_buffers()) {
            return Err(InputError::invalid_parameter(
                "settings",
                "update_passes",
                "no pass with state buffers is enabled",
            ));
        }
        Ok(())
    }

    /// Actuation below which a pressed button is considered released
    pub fn release_point(&self) -> f32 {
        self.default_button_press_point * self.button_release_threshold
    }
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            profile: "release".to_string(),
            default_button_press_point: 0.5,
            button_release_threshold: 0.75,
            default_tap_time: 0.2,
            default_slow_tap_time: 0.5,
            default_hold_time: 0.4,
            multi_tap_delay_time: 0.75,
            default_swipe_distance: 0.5,
            update_passes: vec![UpdateType::Dynamic, UpdateType::Fixed],
            fixed_timestep: 0.02,
            max_fixed_steps_per_frame: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let settings = InputSettings::default();
        assert_eq!(settings.default_button_press_point, 0.5);
        assert_eq!(
            settings.update_mask(),
            UpdateMask::DYNAMIC | UpdateMask::FIXED
        );
        assert!((settings.release_point() - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_load_from_dir_reads_profile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("custom.toml"),
            "default_hold_time = 0.8\nupdate_passes = [\"dynamic\", \"editor\"]\n",
        )
        .unwrap();

        let settings = InputSettings::load_from_dir(dir.path(), "custom").unwrap();
        assert_eq!(settings.profile, "custom");
        assert_eq!(settings.default_hold_time, 0.8);
        // Unset keys keep their defaults
        assert_eq!(settings.default_tap_time, 0.2);
        assert_eq!(
            settings.update_mask(),
            UpdateMask::DYNAMIC | UpdateMask::EDITOR
        );
    }

    #[test]
    fn test_missing_profile_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = InputSettings::load_from_dir(dir.path(), "nothing-here").unwrap();
        assert_eq!(settings.profile, "nothing-here");
        assert_eq!(settings.fixed_timestep, 0.02);
    }

    #[test]
    fn test_validate() {
        assert!(InputSettings::default().validate().is_ok());

        let settings = InputSettings {
            default_button_press_point: 1.5,
            ..InputSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(InputError::InvalidParameter { parameter, .. }) if parameter == "default_button_press_point"
        ));

        let settings = InputSettings {
            update_passes: vec![UpdateType::BeforeRender],
            ..InputSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
