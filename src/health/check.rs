//! Core health check trait and types

use std::fmt::Display;
use std::time::Duration;

use crate::config::InputSettings;

/// Status of a system check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckStatus {
    Pass,
    /// Check passed with warnings
    Warn,
    Fail,
}

impl CheckStatus {
    /// Returns true if the check passed (Pass or Warn)
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Pass | CheckStatus::Warn)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail)
    }

    /// Returns the status as a colored string
    pub fn as_colored_str(&self) -> String {
        use colored::Colorize;
        match self {
            CheckStatus::Pass => "PASS".green().to_string(),
            CheckStatus::Warn => "WARN".yellow().to_string(),
            CheckStatus::Fail => "FAIL".red().to_string(),
        }
    }
}

/// Result of a system check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub status: CheckStatus,
    /// Brief message describing the result
    pub message: String,
    /// One line per observation, shown with `--details`
    pub details: Vec<String>,
    pub duration: Duration,
}

impl CheckResult {
    fn with_status(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Warn, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Fail, message)
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Collects observations and the worst status seen while a check runs
#[derive(Debug, Default)]
pub struct Findings {
    lines: Vec<String>,
    worst: Option<CheckStatus>,
    first_problem: Option<String>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(&mut self, line: impl Display) {
        self.record(CheckStatus::Pass, "✓", line);
    }

    pub fn warn(&mut self, line: impl Display) {
        self.record(CheckStatus::Warn, "⚠", line);
    }

    pub fn fail(&mut self, line: impl Display) {
        self.record(CheckStatus::Fail, "✗", line);
    }

    /// Records `line` as passed if `condition` holds, failed otherwise
    pub fn expect(&mut self, condition: bool, line: impl Display) -> bool {
        if condition {
            self.ok(line);
        } else {
            self.fail(line);
        }
        condition
    }

    pub fn status(&self) -> CheckStatus {
        self.worst.unwrap_or(CheckStatus::Pass)
    }

    /// Builds the result; failing and warning results carry the first
    /// problem as their message
    pub fn finish(self, success: impl Into<String>) -> CheckResult {
        let status = self.status();
        let message = match (status, self.first_problem) {
            (CheckStatus::Pass, _) | (_, None) => success.into(),
            (_, Some(problem)) => problem,
        };
        CheckResult::with_status(status, message).with_details(self.lines)
    }

    fn record(&mut self, status: CheckStatus, marker: &str, line: impl Display) {
        let line = line.to_string();
        if status != CheckStatus::Pass && self.first_problem.is_none() {
            self.first_problem = Some(line.clone());
        }
        self.worst = self.worst.max(Some(status));
        self.lines.push(format!("  {marker} {line}"));
    }
}

/// Trait for system health checks
pub trait SystemCheck {
    /// Name of the system being checked
    fn name(&self) -> &'static str;

    /// Runs the check against the settings under test
    fn check(&self, settings: &InputSettings) -> CheckResult;

    /// Optional description of what this check validates
    fn description(&self) -> Option<&'static str> {
        None
    }
}
