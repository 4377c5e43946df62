//! Solution evaluation: fetch candidate remedies, then derive automation
//! potential and ROI from them.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collaborators::SolutionGenerator;
use crate::error::FrictionError;
use crate::gate::policy::select_best_solution;
use crate::guard::guarded;
use crate::model::{DetectedFriction, RoiEstimate, SolutionRecommendation};

const WEEKS_PER_YEAR: u64 = 52;

/// Best `confidence × reversibility` among auto-implementable automation remedies.
pub fn automation_potential(solutions: &[SolutionRecommendation]) -> f64 {
    solutions
        .iter()
        .filter(|s| s.is_automation() && s.can_auto_implement)
        .map(|s| s.confidence * s.reversibility)
        .fold(0.0, f64::max)
}

/// ROI of the best remedy. `None` when there is nothing to evaluate.
pub fn estimate_roi(
    solutions: &[SolutionRecommendation],
    recurrences_per_week: u32,
) -> Option<RoiEstimate> {
    let (best, _) = select_best_solution(solutions)?;
    let per_week = best
        .expected_time_savings_secs
        .saturating_mul(u64::from(recurrences_per_week));
    let cost = best.estimated_time_to_implement_secs;
    let weeks_to_breakeven = (per_week > 0).then(|| cost as f64 / per_week as f64);
    Some(RoiEstimate {
        weeks_to_breakeven,
        time_savings_per_week_secs: per_week,
        yearly_time_savings_secs: per_week.saturating_mul(WEEKS_PER_YEAR),
        implementation_cost_secs: cost,
        expected_time_savings_secs: best.expected_time_savings_secs,
        confidence: best.confidence,
    })
}

/// Calls the solution generator once per friction, in rank order.
#[derive(Clone)]
pub struct SolutionEvaluator {
    generator: Arc<dyn SolutionGenerator>,
    timeout: Duration,
    recurrences_per_week: u32,
}

impl SolutionEvaluator {
    pub fn new(
        generator: Arc<dyn SolutionGenerator>,
        timeout: Duration,
        recurrences_per_week: u32,
    ) -> Self {
        Self {
            generator,
            timeout,
            recurrences_per_week,
        }
    }

    /// Populate solutions, automation potential and ROI on every friction.
    ///
    /// A generator failure leaves that friction with no solutions, zero
    /// potential and no ROI; the failures are returned for reporting.
    pub async fn evaluate(
        &self,
        frictions: &mut [DetectedFriction],
        cancel: &CancellationToken,
    ) -> Vec<FrictionError> {
        let mut failures = Vec::new();
        for friction in frictions.iter_mut() {
            let outcome = guarded(
                self.timeout,
                cancel,
                self.generator.generate_solutions(friction),
            )
            .await;
            match outcome {
                Ok(solutions) => {
                    friction.automation_potential = automation_potential(&solutions);
                    friction.roi_estimate = estimate_roi(&solutions, self.recurrences_per_week);
                    debug!(
                        friction_id = %friction.id,
                        solutions = solutions.len(),
                        automation_potential = friction.automation_potential,
                        "Solutions evaluated"
                    );
                    friction.recommended_solutions = solutions;
                }
                Err(cause) => {
                    let err = FrictionError::SolutionGenerationFailure {
                        friction_id: friction.id,
                        cause,
                    };
                    warn!(friction_id = %friction.id, error = %err, "No solutions for friction");
                    friction.recommended_solutions.clear();
                    friction.automation_potential = 0.0;
                    friction.roi_estimate = None;
                    failures.push(err);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::{FrictionSource, FrictionType, RiskLevel, SolutionType};

    const HOUR: u64 = 60 * 60;

    fn automation(confidence: f64, reversibility: f64, auto: bool) -> SolutionRecommendation {
        SolutionRecommendation::new(SolutionType::Automation, confidence, RiskLevel::Low)
            .with_reversibility(reversibility)
            .auto_implementable(auto)
    }

    #[test]
    fn potential_only_counts_auto_automation() {
        let solutions = vec![
            automation(0.9, 0.5, true),
            automation(0.99, 0.99, false),
            SolutionRecommendation::new(SolutionType::Tooling, 1.0, RiskLevel::Low)
                .with_reversibility(1.0)
                .auto_implementable(true),
            automation(0.8, 0.75, true),
        ];
        assert!((automation_potential(&solutions) - 0.6).abs() < 1e-9);
        assert_eq!(automation_potential(&[]), 0.0);
    }

    #[test]
    fn roi_from_best_solution() {
        let best = automation(0.9, 0.8, true)
            .with_timing(Duration::from_secs(4 * HOUR), Duration::from_secs(2 * HOUR));
        let roi = estimate_roi(&[best], 5).unwrap();
        assert_eq!(roi.weeks_to_breakeven, Some(0.4));
        assert_eq!(roi.yearly_time_savings(), Duration::from_secs(520 * HOUR));
        assert_eq!(roi.time_savings_per_week_secs, 10 * HOUR);
        assert_eq!(roi.confidence, 0.9);
    }

    #[test]
    fn roi_absent_without_solutions_and_unbounded_without_savings() {
        assert!(estimate_roi(&[], 5).is_none());
        let no_savings = automation(0.9, 0.8, true)
            .with_timing(Duration::from_secs(HOUR), Duration::ZERO);
        let roi = estimate_roi(&[no_savings], 5).unwrap();
        assert_eq!(roi.weeks_to_breakeven, None);
        assert_eq!(roi.yearly_time_savings_secs, 0);
    }

    struct FailsFor(FrictionType);

    #[async_trait]
    impl SolutionGenerator for FailsFor {
        async fn generate_solutions(
            &self,
            friction: &DetectedFriction,
        ) -> anyhow::Result<Vec<SolutionRecommendation>> {
            if friction.friction_type == self.0 {
                anyhow::bail!("generator overloaded");
            }
            Ok(vec![automation(0.9, 0.5, true)
                .with_timing(Duration::from_secs(HOUR), Duration::from_secs(HOUR))])
        }
    }

    #[tokio::test]
    async fn generator_failure_is_scoped_to_one_friction() {
        let evaluator = SolutionEvaluator::new(
            Arc::new(FailsFor(FrictionType::SecurityIssue)),
            Duration::from_secs(1),
            5,
        );
        let mut frictions = vec![
            DetectedFriction::new(FrictionType::RepetitiveTask, FrictionSource::Pattern, 0.5, 0.5, 0.5),
            DetectedFriction::new(FrictionType::SecurityIssue, FrictionSource::Anomaly, 0.9, 0.0, 0.8),
        ];
        let failures = evaluator
            .evaluate(&mut frictions, &CancellationToken::new())
            .await;

        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            FrictionError::SolutionGenerationFailure { friction_id, .. } if *friction_id == frictions[1].id
        ));
        assert_eq!(frictions[0].recommended_solutions.len(), 1);
        assert!((frictions[0].automation_potential - 0.45).abs() < 1e-9);
        assert!(frictions[0].roi_estimate.is_some());
        assert!(frictions[1].recommended_solutions.is_empty());
        assert_eq!(frictions[1].automation_potential, 0.0);
        assert!(frictions[1].roi_estimate.is_none());
    }
}
