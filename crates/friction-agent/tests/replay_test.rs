//! Replays fixtures through the full agent wiring.

use std::path::PathBuf;

use friction_agent::config::{AgentConfig, ExecutorMode};
use friction_agent::replay::SessionFixture;
use friction_engine::{FrictionStatus, FrictionType, GateVerdict, PipelinePhase};
use tokio_util::sync::CancellationToken;

fn sample_fixture() -> SessionFixture {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-session.json");
    SessionFixture::load(&path).unwrap()
}

#[tokio::test]
async fn sample_session_detects_ranks_and_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("state/ledger.jsonl");
    let mut config = AgentConfig::default();
    config.ledger.path = Some(ledger.clone());

    let report = friction_agent::replay_session(
        &config,
        sample_fixture(),
        true,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let detection = &report.detection;
    assert_eq!(detection.sensors_missing, ["git_workflow"]);
    assert_eq!(
        detection.sensors_collected,
        ["build_performance", "test_efficiency"]
    );
    // Two patterns, one workflow issue, one significant anomaly, one confident prediction.
    assert_eq!(detection.frictions.len(), 5);
    assert_eq!(
        detection.frictions[0].friction_type,
        FrictionType::PerformanceBottleneck
    );
    assert_eq!(detection.frictions[0].context.flaky_tests, Some(3));
    assert!(detection.degraded_phases.is_empty());

    let gate = report.gate.as_ref().unwrap();
    assert_eq!(gate.count(GateVerdict::Resolved), 2);
    assert_eq!(gate.count(GateVerdict::Declined), 3);
    let resolved: Vec<_> = detection
        .frictions
        .iter()
        .filter(|f| f.status == FrictionStatus::Resolved)
        .map(|f| f.friction_type.clone())
        .collect();
    assert_eq!(
        resolved,
        [FrictionType::PerformanceBottleneck, FrictionType::RepetitiveTask]
    );
    assert_eq!(report.metrics.resolved_frictions, 2);

    let summary = friction_agent::summarize_ledger(&ledger).await.unwrap();
    assert_eq!(summary.detections, 1);
    assert_eq!(summary.resolutions, 2);
    assert_eq!(summary.pattern_feedback, 4);
    assert_eq!(summary.total_frictions, 5);
    assert_eq!(summary.patterns["manual-changelog"].observations, 1);
}

#[tokio::test]
async fn detection_only_run_leaves_frictions_untouched() {
    let report = friction_agent::replay_session(
        &AgentConfig::default(),
        sample_fixture(),
        false,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.gate.is_none());
    assert!(report
        .detection
        .frictions
        .iter()
        .all(|f| f.status != FrictionStatus::Resolved));
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("gate").is_none());
}

#[tokio::test]
async fn scripted_model_failure_degrades_its_phase() {
    let mut fixture = sample_fixture();
    fixture.failures.pattern_recognition = Some("pattern service returned 503".into());

    let report = friction_agent::replay_session(
        &AgentConfig::default(),
        fixture,
        false,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        report.detection.degraded_phases,
        [PipelinePhase::PatternRecognition]
    );
    assert_eq!(report.detection.frictions.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("503"));
}

fn single_remedy_fixture(script: &str, rollback: &str) -> SessionFixture {
    let json = r#"{
            "session": { "developer": "dana", "project": "atlas" },
            "sensors": {
                "build_performance": { "kind": "build_performance", "data": { "average_build_secs": 120.0 } }
            },
            "patterns": [
                { "id": "slow-builds", "severity": 0.6, "frequency": 0.5, "confidence": 0.9,
                  "typical_friction": ["performance_bottleneck"] }
            ],
            "solutions": {
                "*": [
                    { "type": "automation", "confidence": 0.9, "risk_level": "low", "reversibility": 0.9,
                      "can_auto_implement": true, "automation_script": "SCRIPT",
                      "rollback_script": "ROLLBACK" }
                ]
            }
        }"#;
    SessionFixture::from_json(&json.replace("SCRIPT", script).replace("ROLLBACK", rollback))
        .unwrap()
}

fn command_config(dir: &std::path::Path, programs: &[&str]) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.executor.mode = ExecutorMode::Command;
    config.executor.working_dir = dir.to_path_buf();
    config.executor.allowed_programs = programs.iter().map(|p| p.to_string()).collect();
    config
}

#[tokio::test]
async fn command_mode_rolls_back_failed_remedy() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = single_remedy_fixture("false", "touch rolled.back");
    let config = command_config(dir.path(), &["false", "touch"]);

    let report = friction_agent::replay_session(&config, fixture, true, &CancellationToken::new())
        .await
        .unwrap();

    let gate = report.gate.unwrap();
    assert_eq!(gate.count(GateVerdict::RolledBack), 1);
    assert!(gate.resolutions.is_empty());
    assert!(dir.path().join("rolled.back").exists());
    assert_eq!(report.metrics.failed_resolutions, 1);
    assert_eq!(report.detection.frictions[0].status, FrictionStatus::Detected);
}

#[tokio::test]
async fn slow_remedy_is_rolled_back_within_the_execution_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = single_remedy_fixture("sleep 5", "touch rolled.back");
    let mut config = command_config(dir.path(), &["sleep", "touch"]);
    config.executor.command_timeout_ms = 100;
    config.engine.execution_timeout_ms = 2_000;

    let report = friction_agent::replay_session(&config, fixture, true, &CancellationToken::new())
        .await
        .unwrap();

    let gate = report.gate.unwrap();
    assert_eq!(gate.count(GateVerdict::RolledBack), 1);
    assert!(dir.path().join("rolled.back").exists());
    assert_eq!(report.metrics.failed_resolutions, 1);
}

#[tokio::test]
async fn command_timeout_that_outlasts_the_gate_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = single_remedy_fixture("sleep 5", "touch rolled.back");
    let mut config = command_config(dir.path(), &["sleep", "touch"]);
    config.engine.execution_timeout_ms = 300;
    config.executor.command_timeout_ms = 10_000;

    let err = friction_agent::replay_session(&config, fixture, true, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("execution_timeout_ms"), "{err:#}");
    assert!(!dir.path().join("rolled.back").exists());
}
