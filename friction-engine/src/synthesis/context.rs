//! Context snapshots attached to every synthesized friction.

use chrono::{Datelike, Timelike};

use crate::model::{FrictionContext, SessionAnalysis};
use crate::sensors::{SensorBundle, SensorReading};

/// Session and sensor facts shared by every friction of one run.
pub fn base_context(session: &SessionAnalysis, bundle: &SensorBundle) -> FrictionContext {
    let captured_at = bundle.collected_at();
    FrictionContext {
        developer: session.developer.clone(),
        project: session.project.clone(),
        working_directory: session.working_directory.clone(),
        git_branch: session.git_branch.clone(),
        captured_at: Some(captured_at),
        day_of_week: captured_at.weekday().to_string(),
        hour: captured_at.hour(),
        current_task: session.current_task.clone(),
        workflow_stage: session.workflow_stage.clone(),
        tools_in_use: session.tools_in_use.clone(),
        affected_files: Vec::new(),
        average_build_secs: bundle.find(|r| match r {
            SensorReading::BuildPerformance {
                average_build_secs, ..
            } => Some(*average_build_secs),
            _ => None,
        }),
        flaky_tests: bundle.find(|r| match r {
            SensorReading::TestEfficiency { flaky_tests, .. } => Some(*flaky_tests),
            _ => None,
        }),
        merge_conflicts: bundle.find(|r| match r {
            SensorReading::GitWorkflow {
                merge_conflicts, ..
            } => Some(*merge_conflicts),
            _ => None,
        }),
        outdated_dependencies: bundle.find(|r| match r {
            SensorReading::Dependencies { outdated, .. } => Some(*outdated),
            _ => None,
        }),
        sensors_reporting: bundle.readings().keys().cloned().collect(),
    }
}

/// The base context narrowed to the files a single finding touches.
pub fn scoped(base: &FrictionContext, affected_files: &[String]) -> FrictionContext {
    let mut context = base.clone();
    context.affected_files = affected_files.to_vec();
    context
}
