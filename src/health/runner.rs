//! Runs health checks against one settings profile

use std::time::Instant;

use tracing::{debug, warn};

use super::check::{CheckResult, CheckStatus, SystemCheck};
use crate::config::InputSettings;

/// Results from running a health check suite
#[derive(Debug)]
pub struct HealthCheckReport {
    /// Profile the checks ran against
    pub profile: String,
    /// Individual check results with their system names
    pub results: Vec<(String, CheckResult)>,
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
}

impl HealthCheckReport {
    /// Returns true if no check failed
    pub fn is_healthy(&self) -> bool {
        self.failed == 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warned > 0
    }

    /// 0 = all pass, 1 = any fail, 2 = any warn (but no fail)
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else if self.warned > 0 {
            2
        } else {
            0
        }
    }

    /// Result of the check called `name`
    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, result)| result)
    }
}

/// Orchestrates running health checks and collecting results
pub struct HealthCheckRunner {
    settings: InputSettings,
    checks: Vec<Box<dyn SystemCheck>>,
}

impl HealthCheckRunner {
    /// Creates a runner with no checks for `settings`
    pub fn new(settings: InputSettings) -> Self {
        Self {
            settings,
            checks: Vec::new(),
        }
    }

    pub fn add_check<C: SystemCheck + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Runs all registered checks in order and returns a report
    pub fn run(self) -> HealthCheckReport {
        let mut report = HealthCheckReport {
            profile: self.settings.profile.clone(),
            results: Vec::with_capacity(self.checks.len()),
            total: 0,
            passed: 0,
            warned: 0,
            failed: 0,
        };

        for check in &self.checks {
            let start = Instant::now();
            let result = check.check(&self.settings).with_duration(start.elapsed());

            match result.status {
                CheckStatus::Pass => report.passed += 1,
                CheckStatus::Warn => report.warned += 1,
                CheckStatus::Fail => {
                    warn!(check = check.name(), message = %result.message, "Health check failed");
                    report.failed += 1;
                }
            }
            debug!(
                check = check.name(),
                status = ?result.status,
                duration = ?result.duration,
                "Health check finished"
            );
            report.results.push((check.name().to_string(), result));
        }

        report.total = report.results.len();
        report
    }
}

impl Default for HealthCheckRunner {
    fn default() -> Self {
        Self::new(InputSettings::default())
    }
}
