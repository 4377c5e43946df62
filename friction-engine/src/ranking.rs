//! Deterministic priority scoring and ordering.
//!
//! ```text
//! score = 0.4·severity + 0.3·developer_impact + 0.2·frequency
//! type == security_issue           → × 1.5
//! type == performance_bottleneck   → × 1.3
//! category == critical             → × 1.4
//! risk assessment present          → × (1 + 0.2·business_impact)
//! ```
//!
//! The weights sum to 0.9; scores are relative and never normalized.

use tracing::debug;

use crate::model::{DetectedFriction, FrictionCategory, FrictionType};

const SEVERITY_WEIGHT: f64 = 0.4;
const IMPACT_WEIGHT: f64 = 0.3;
const FREQUENCY_WEIGHT: f64 = 0.2;

const SECURITY_MULTIPLIER: f64 = 1.5;
const PERFORMANCE_BOTTLENECK_MULTIPLIER: f64 = 1.3;
const CRITICAL_CATEGORY_MULTIPLIER: f64 = 1.4;
const BUSINESS_IMPACT_WEIGHT: f64 = 0.2;

/// Priority of one friction, computed from its current fields only.
pub fn priority_score(friction: &DetectedFriction) -> f64 {
    let mut score = SEVERITY_WEIGHT * friction.severity
        + IMPACT_WEIGHT * friction.developer_impact
        + FREQUENCY_WEIGHT * friction.frequency;

    match friction.friction_type {
        FrictionType::SecurityIssue => score *= SECURITY_MULTIPLIER,
        FrictionType::PerformanceBottleneck => score *= PERFORMANCE_BOTTLENECK_MULTIPLIER,
        _ => {}
    }
    if friction.category == FrictionCategory::Critical {
        score *= CRITICAL_CATEGORY_MULTIPLIER;
    }
    if let Some(risk) = &friction.risk_assessment {
        score *= 1.0 + BUSINESS_IMPACT_WEIGHT * risk.business_impact;
    }
    score
}

/// Store each friction's score and sort descending.
///
/// The sort is stable, so equal scores keep discovery order and ranking an
/// already ranked list is a no-op.
pub fn rank(mut frictions: Vec<DetectedFriction>) -> Vec<DetectedFriction> {
    for friction in &mut frictions {
        friction.priority_score = Some(priority_score(friction));
    }
    frictions.sort_by(|a, b| {
        let a = a.priority_score.unwrap_or_default();
        let b = b.priority_score.unwrap_or_default();
        b.total_cmp(&a)
    });
    if let Some(top) = frictions.first() {
        debug!(
            count = frictions.len(),
            top_friction = %top.id,
            top_score = top.priority_score.unwrap_or_default(),
            "Frictions ranked"
        );
    }
    frictions
}
