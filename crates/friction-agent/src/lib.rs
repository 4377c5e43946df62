//! Friction agent: replays recorded developer sessions through the friction
//! engine, applies gated remedies and keeps the outcome ledger on disk.

pub mod config;
pub mod executor;
pub mod replay;
pub mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use friction_engine::{FrictionEngine, JsonlLedgerStorage};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AgentConfig;
use crate::replay::{ReplayModels, SessionFixture};
use crate::report::{LedgerReport, SessionReport};

/// Wire the fixture's sensors and models, the configured executor and ledger.
pub fn build_engine(config: &AgentConfig, fixture: Arc<SessionFixture>) -> Result<FrictionEngine> {
    config.validate()?;
    let models = Arc::new(ReplayModels::new(Arc::clone(&fixture)));
    let mut builder = FrictionEngine::builder()
        .config(config.engine.clone())
        .sensors(fixture.sensors())
        .pattern_recognizer(models.clone())
        .workflow_analyzer(models.clone())
        .anomaly_detector(models.clone())
        .predictor(models.clone())
        .solution_generator(models)
        .executor(executor::from_config(&config.executor));
    if let Some(path) = &config.ledger.path {
        builder = builder.ledger_storage(Arc::new(JsonlLedgerStorage::new(path.clone())));
    }
    builder.build().context("Failed to build friction engine")
}

/// Run one fixture end to end. `resolve` enables the auto-resolution gate.
pub async fn replay_session(
    config: &AgentConfig,
    fixture: SessionFixture,
    resolve: bool,
    cancel: &CancellationToken,
) -> Result<SessionReport> {
    let fixture = Arc::new(fixture);
    let engine = build_engine(config, Arc::clone(&fixture))?;
    info!(
        session_id = %fixture.session.session_id,
        developer = %fixture.session.developer,
        project = %fixture.session.project,
        executor = ?config.executor.mode,
        resolve,
        "Replaying session"
    );

    let outcome = engine.run_session(&fixture.session, resolve, cancel).await;
    Ok(SessionReport::new(outcome, engine.metrics().await))
}

/// Fold a JSONL ledger file into a [`LedgerReport`].
pub async fn summarize_ledger(path: &Path) -> Result<LedgerReport> {
    let records = JsonlLedgerStorage::read_all(path)
        .await
        .with_context(|| format!("Failed to read ledger {}", path.display()))?;
    Ok(LedgerReport::from_records(&records))
}
