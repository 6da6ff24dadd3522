//! Integration tests for the health check system

use inputflow::config::InputSettings;
use inputflow::health::{self, CheckStatus, HealthCheckRunner, SystemCheck, checks::*};

#[test]
fn test_all_health_checks() {
    let report = health::run_all_checks(InputSettings::default());

    // Print report for debugging if tests fail
    if !report.is_healthy() {
        eprintln!("\n{}", health::format_report(&report));
        eprintln!("{}", health::format_details(&report));
    }

    assert!(
        report.is_healthy(),
        "Health checks failed: {} failures, {} warnings",
        report.failed,
        report.warned
    );
    assert_eq!(report.total, 5);
}

#[test]
fn test_state_buffer_check() {
    let result = StateBufferCheck::new().check(&InputSettings::default());
    assert!(
        result.status.is_ok(),
        "State buffer check failed: {}",
        result.message
    );
}

#[test]
fn test_registry_check() {
    let result = RegistryCheck::new().check(&InputSettings::default());
    assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
}

#[test]
fn test_resolver_check() {
    let result = ResolverCheck::new().check(&InputSettings::default());
    assert!(
        result.status.is_ok(),
        "Resolver check failed: {}",
        result.message
    );
}

#[test]
fn test_pipeline_check() {
    let result = PipelineCheck::new().check(&InputSettings::default());
    assert_eq!(
        result.status,
        CheckStatus::Pass,
        "Pipeline check failed: {}\n{}",
        result.message,
        result.details.join("\n")
    );
}

#[test]
fn test_pipeline_check_with_every_pass() {
    let mut settings = InputSettings::default();
    settings.update_passes = vec![
        inputflow::state::UpdateType::Dynamic,
        inputflow::state::UpdateType::Fixed,
        inputflow::state::UpdateType::BeforeRender,
        inputflow::state::UpdateType::Editor,
    ];
    let result = PipelineCheck::new().check(&settings);
    assert!(result.status.is_ok(), "{}", result.message);
}

#[test]
fn test_invalid_settings_fail_config_check() {
    let mut settings = InputSettings::default();
    settings.default_button_press_point = 0.0;
    let result = ConfigCheck::new().check(&settings);
    assert!(result.status.is_fail());
}

#[test]
fn test_runner_collects_all_checks() {
    let report = HealthCheckRunner::new(InputSettings::default())
        .add_check(StateBufferCheck::new())
        .add_check(PipelineCheck::new())
        .run();

    assert_eq!(report.total, 2, "Expected 2 checks in report");
    assert_eq!(report.passed + report.warned + report.failed, report.total);
    assert!(report.result("Event Pipeline").is_some());
}

#[test]
fn test_report_exit_codes() {
    let report = HealthCheckRunner::new(InputSettings::default())
        .add_check(PipelineCheck::new())
        .run();

    if report.failed > 0 {
        assert_eq!(report.exit_code(), 1);
    } else if report.warned > 0 {
        assert_eq!(report.exit_code(), 2);
    } else {
        assert_eq!(report.exit_code(), 0);
    }
}
