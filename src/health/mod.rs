//! Health checks for validating an input setup
//!
//! Useful for:
//! - Validating settings profiles before shipping them
//! - CI health checks of the event pipeline
//! - Debugging binding resolution problems
//!
//! # Example
//!
//! ```no_run
//! use inputflow::config::InputSettings;
//! use inputflow::health::{HealthCheckRunner, checks::*};
//!
//! let report = HealthCheckRunner::new(InputSettings::load_or_default("debug"))
//!     .add_check(ConfigCheck::new())
//!     .add_check(PipelineCheck::new())
//!     .run();
//!
//! if report.is_healthy() {
//!     println!("Input pipeline operational");
//! }
//! ```

pub mod check;
pub mod checks;
pub mod fixtures;
pub mod reporter;
pub mod runner;

pub use check::{CheckResult, CheckStatus, Findings, SystemCheck};
pub use reporter::{format_details, format_report, print_report};
pub use runner::{HealthCheckReport, HealthCheckRunner};

use crate::config::InputSettings;

/// Runs all built-in checks against `settings`
pub fn run_all_checks(settings: InputSettings) -> HealthCheckReport {
    HealthCheckRunner::new(settings)
        .add_check(checks::ConfigCheck::new())
        .add_check(checks::StateBufferCheck::new())
        .add_check(checks::RegistryCheck::new())
        .add_check(checks::ResolverCheck::new())
        .add_check(checks::PipelineCheck::new())
        .run()
}
