//! Resolution gate: decide which frictions may be fixed without approval,
//! run their selected remedies and record the outcomes.
//!
//! ```text
//! for friction in rank order:
//!     resolved already       → skipped
//!     !can_auto_resolve      → declined (technical risk | no qualifying solution)
//!     no unattended solution → declined (approval required)
//!     best unattended        → resolving, spawned
//! spawned: semaphore permit → file locks (sorted) → guarded(executor)
//! apply outcomes in rank order:
//!     success                → resolved, ledger
//!     success == false       → prior status, ledger (failed attempt)
//!     error                  → prior status, ledger (failed attempt, error), error!
//!     cancelled              → prior status, error!
//! ```

pub mod locks;
pub mod policy;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::collaborators::SolutionExecutor;
use crate::config::GatePolicy;
use crate::error::{CallFailure, FrictionError};
use crate::guard::guarded;
use crate::ledger::OutcomeLedger;
use crate::model::{
    DetectedFriction, FrictionResolution, FrictionStatus, SolutionRecommendation, SolutionType,
};

use locks::FileLockTable;
pub use policy::{
    can_auto_resolve, select_best_solution, select_unattended_solution, solution_score,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateVerdict {
    Resolved,
    ExecutionFailed,
    RolledBack,
    Declined,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    /// The friction's assessed technical risk exceeds the policy limit.
    TechnicalRiskTooHigh,
    /// No solution is low-risk, confident and auto-implementable.
    NoQualifyingSolution,
    /// Every qualifying solution needs a human.
    ApprovalRequired,
}

/// Audit entry for one friction the gate considered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub friction_id: Uuid,
    pub verdict: GateVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_solution: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decline_reason: Option<DeclineReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GateDecision {
    fn new(friction_id: Uuid, verdict: GateVerdict) -> Self {
        Self {
            friction_id,
            verdict,
            selected_solution: None,
            selection_score: None,
            decline_reason: None,
            error: None,
        }
    }

    fn declined(friction_id: Uuid, reason: DeclineReason) -> Self {
        Self {
            decline_reason: Some(reason),
            ..Self::new(friction_id, GateVerdict::Declined)
        }
    }
}

/// Everything one gate pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    /// Successful resolutions, in rank order.
    pub resolutions: Vec<FrictionResolution>,
    /// One decision per friction considered, in rank order.
    pub decisions: Vec<GateDecision>,
    #[serde(skip)]
    pub failures: Vec<FrictionError>,
}

impl GateReport {
    pub fn count(&self, verdict: GateVerdict) -> usize {
        self.decisions.iter().filter(|d| d.verdict == verdict).count()
    }
}

type Execution = (Duration, Result<FrictionResolution, CallFailure>);

struct Scheduled {
    index: usize,
    prior_status: FrictionStatus,
    solution_id: Uuid,
    solution_type: SolutionType,
    decision: GateDecision,
    handle: JoinHandle<Execution>,
}

pub struct ResolutionGate {
    executor: Arc<dyn SolutionExecutor>,
    ledger: Arc<OutcomeLedger>,
    policy: GatePolicy,
    timeout: Duration,
    permits: Arc<Semaphore>,
    locks: FileLockTable,
}

impl ResolutionGate {
    pub fn new(
        executor: Arc<dyn SolutionExecutor>,
        ledger: Arc<OutcomeLedger>,
        policy: GatePolicy,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            executor,
            ledger,
            policy,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            locks: FileLockTable::new(),
        }
    }

    /// Gate every friction, execute the eligible ones and update statuses in place.
    pub async fn resolve_all(
        &self,
        frictions: &mut [DetectedFriction],
        cancel: &CancellationToken,
    ) -> GateReport {
        let mut report = GateReport::default();
        let mut slots: Vec<Option<GateDecision>> = vec![None; frictions.len()];
        let mut scheduled = Vec::new();

        for (index, friction) in frictions.iter_mut().enumerate() {
            if friction.is_resolved() {
                slots[index] = Some(GateDecision::new(friction.id, GateVerdict::Skipped));
                continue;
            }
            if !can_auto_resolve(friction, &self.policy) {
                let reason = if friction
                    .risk_assessment
                    .as_ref()
                    .is_some_and(|r| r.technical_risk > self.policy.max_technical_risk)
                {
                    DeclineReason::TechnicalRiskTooHigh
                } else {
                    DeclineReason::NoQualifyingSolution
                };
                friction.status = FrictionStatus::Declined;
                info!(friction_id = %friction.id, reason = ?reason, "Auto-resolution declined");
                slots[index] = Some(GateDecision::declined(friction.id, reason));
                continue;
            }
            let Some((best, score)) =
                select_unattended_solution(&friction.recommended_solutions, &self.policy)
            else {
                friction.status = FrictionStatus::Declined;
                info!(
                    friction_id = %friction.id,
                    "Qualifying solutions all need approval, auto-resolution declined"
                );
                slots[index] = Some(GateDecision::declined(
                    friction.id,
                    DeclineReason::ApprovalRequired,
                ));
                continue;
            };
            let best = best.clone();

            let prior_status = friction.status;
            friction.status = FrictionStatus::Resolving;
            let mut decision = GateDecision::new(friction.id, GateVerdict::Resolved);
            decision.selected_solution = Some(best.id);
            decision.selection_score = Some(score);
            let solution_id = best.id;
            let solution_type = best.solution_type.clone();
            let handle = self.spawn_execution(friction.clone(), best, cancel.clone());
            scheduled.push(Scheduled {
                index,
                prior_status,
                solution_id,
                solution_type,
                decision,
                handle,
            });
        }

        for job in scheduled {
            let friction = &mut frictions[job.index];
            let mut decision = job.decision;
            let (elapsed, outcome) = match job.handle.await {
                Ok(execution) => execution,
                Err(e) => (
                    Duration::ZERO,
                    Err(CallFailure::Failed {
                        message: format!("executor task panicked: {e}"),
                    }),
                ),
            };
            let outcome = outcome.and_then(|resolution| {
                if resolution.friction_id == friction.id {
                    Ok(resolution)
                } else {
                    Err(CallFailure::Failed {
                        message: format!(
                            "executor returned a resolution for friction {}",
                            resolution.friction_id
                        ),
                    })
                }
            });

            match outcome {
                Ok(resolution) if resolution.success => {
                    friction.status = FrictionStatus::Resolved;
                    friction.resolution = Some(resolution.clone());
                    self.ledger.store_resolution(friction, &resolution).await;
                    info!(
                        friction_id = %friction.id,
                        solution_id = %resolution.solution_id,
                        time_taken_ms = resolution.time_taken_ms,
                        "Friction auto-resolved"
                    );
                    report.resolutions.push(resolution);
                }
                Ok(resolution) => {
                    friction.status = job.prior_status;
                    decision.verdict = if resolution.rolled_back {
                        GateVerdict::RolledBack
                    } else {
                        GateVerdict::ExecutionFailed
                    };
                    self.ledger.store_resolution(friction, &resolution).await;
                    warn!(
                        friction_id = %friction.id,
                        rolled_back = resolution.rolled_back,
                        "Remedy reported failure"
                    );
                }
                Err(cause) => {
                    friction.status = job.prior_status;
                    decision.verdict = GateVerdict::ExecutionFailed;
                    if !cause.is_cancelled() {
                        let attempt = FrictionResolution::failed(
                            friction.id,
                            job.solution_id,
                            job.solution_type,
                            elapsed,
                            false,
                        )
                        .with_error(cause.to_string());
                        self.ledger.store_resolution(friction, &attempt).await;
                    }
                    let err = FrictionError::ResolutionExecutionFailure {
                        friction_id: friction.id,
                        cause,
                    };
                    error!(friction_id = %friction.id, error = %err, "Auto-resolution failed");
                    decision.error = Some(err.to_string());
                    report.failures.push(err);
                }
            }
            slots[job.index] = Some(decision);
        }

        report.decisions = slots.into_iter().flatten().collect();
        report
    }

    fn spawn_execution(
        &self,
        friction: DetectedFriction,
        solution: SolutionRecommendation,
        cancel: CancellationToken,
    ) -> JoinHandle<Execution> {
        let executor = Arc::clone(&self.executor);
        let permits = Arc::clone(&self.permits);
        let locks = self.locks.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                let closed = CallFailure::Failed {
                    message: "resolution permits closed".into(),
                };
                return (Duration::ZERO, Err(closed));
            };
            let _files = locks.acquire(&solution.affected_files).await;
            let started = Instant::now();
            let outcome = guarded(
                timeout,
                &cancel,
                executor.implement_solution(&friction, &solution),
            )
            .await;
            (started.elapsed(), outcome)
        })
    }
}

impl std::fmt::Debug for ResolutionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionGate")
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
