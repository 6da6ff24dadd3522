//! Settings health check

use crate::config::InputSettings;
use crate::health::check::{CheckResult, Findings, SystemCheck};

/// Checks that every profile loads and holds usable values
pub struct ConfigCheck {
    profiles: Vec<&'static str>,
}

impl ConfigCheck {
    pub fn new() -> Self {
        Self {
            profiles: vec!["debug", "release"],
        }
    }

    pub fn with_profiles(profiles: Vec<&'static str>) -> Self {
        Self { profiles }
    }
}

impl Default for ConfigCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for ConfigCheck {
    fn name(&self) -> &'static str {
        "Configuration"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates settings loading from profile files and environment")
    }

    fn check(&self, settings: &InputSettings) -> CheckResult {
        let mut findings = Findings::new();

        for profile in &self.profiles {
            match InputSettings::load(profile) {
                Ok(loaded) => match loaded.validate() {
                    Ok(()) => findings.ok(format!(
                        "Profile '{profile}': passes {:?}, fixed step {}s",
                        loaded.update_passes, loaded.fixed_timestep
                    )),
                    Err(e) => findings.fail(format!("Profile '{profile}': {e}")),
                },
                Err(e) => findings.fail(format!("Profile '{profile}' failed to load: {e}")),
            }
        }

        match InputSettings::load_from_env() {
            Ok(loaded) => findings.ok(format!("Environment profile '{}' loaded", loaded.profile)),
            Err(e) => findings.warn(format!("Environment settings: {e}")),
        }

        match settings.validate() {
            Ok(()) => findings.ok(format!("Active profile '{}' is valid", settings.profile)),
            Err(e) => findings.fail(format!("Active profile '{}': {e}", settings.profile)),
        }

        findings.finish(format!("{} profiles validated", self.profiles.len()))
    }
}
