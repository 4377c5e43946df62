//! Auto-resolution eligibility and remedy selection.
//!
//! ```text
//! eligible  = !(risk.technical_risk > max_technical_risk)
//!             && any(s.risk == required && s.confidence > min_confidence && s.can_auto_implement)
//! selection = argmax 0.4·confidence + 0.3·(1 − risk_value) + 0.2·reversibility
//!                    + 0.1·priority (+ 0.2 if can_auto_implement)
//! ```
//!
//! The gate only runs the argmax over solutions that qualify and need no approval.

use crate::config::GatePolicy;
use crate::model::{DetectedFriction, SolutionRecommendation};

const CONFIDENCE_WEIGHT: f64 = 0.4;
const SAFETY_WEIGHT: f64 = 0.3;
const REVERSIBILITY_WEIGHT: f64 = 0.2;
const PRIORITY_WEIGHT: f64 = 0.1;
const AUTO_IMPLEMENT_BONUS: f64 = 0.2;

/// Whether `friction` may be resolved without human approval.
pub fn can_auto_resolve(friction: &DetectedFriction, policy: &GatePolicy) -> bool {
    if let Some(risk) = &friction.risk_assessment {
        if risk.technical_risk > policy.max_technical_risk {
            return false;
        }
    }
    friction
        .recommended_solutions
        .iter()
        .any(|s| qualifies(s, policy))
}

fn qualifies(solution: &SolutionRecommendation, policy: &GatePolicy) -> bool {
    solution.risk_level == policy.required_risk_level
        && solution.confidence > policy.min_solution_confidence
        && solution.can_auto_implement
}

/// Selection score of one remedy. Unbounded above; priority is not normalized.
pub fn solution_score(solution: &SolutionRecommendation) -> f64 {
    let mut score = CONFIDENCE_WEIGHT * solution.confidence
        + SAFETY_WEIGHT * (1.0 - solution.risk_level.value())
        + REVERSIBILITY_WEIGHT * solution.reversibility
        + PRIORITY_WEIGHT * f64::from(solution.priority);
    if solution.can_auto_implement {
        score += AUTO_IMPLEMENT_BONUS;
    }
    score
}

/// Highest-scoring remedy; the first one wins a tie. `None` only for an empty list.
pub fn select_best_solution(
    solutions: &[SolutionRecommendation],
) -> Option<(&SolutionRecommendation, f64)> {
    best_of(solutions)
}

/// Highest-scoring remedy the gate may run without a human: it qualifies under
/// `policy` and does not require approval.
pub fn select_unattended_solution<'a>(
    solutions: &'a [SolutionRecommendation],
    policy: &GatePolicy,
) -> Option<(&'a SolutionRecommendation, f64)> {
    best_of(
        solutions
            .iter()
            .filter(|s| qualifies(s, policy) && s.is_unattended()),
    )
}

fn best_of<'a>(
    candidates: impl IntoIterator<Item = &'a SolutionRecommendation>,
) -> Option<(&'a SolutionRecommendation, f64)> {
    let mut best: Option<(&SolutionRecommendation, f64)> = None;
    for solution in candidates {
        let score = solution_score(solution);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((solution, score)),
        }
    }
    best
}
