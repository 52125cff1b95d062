//! Progress notification port
//!
//! Defines the interface for reporting progress during a consensus run.

use consensus_domain::Stage;

/// Callback for progress updates during a consensus run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain text, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a stage starts
    fn on_stage_start(&self, stage: Stage, total_tasks: usize);

    /// Called when a task completes within a stage
    fn on_task_complete(&self, stage: Stage, persona_name: &str, success: bool);

    /// Called when a stage completes
    fn on_stage_complete(&self, stage: Stage);

    /// Called when the critique stage is skipped and raw confidences are used
    fn on_degraded(&self, _reason: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_stage_start(&self, _stage: Stage, _total_tasks: usize) {}
    fn on_task_complete(&self, _stage: Stage, _persona_name: &str, _success: bool) {}
    fn on_stage_complete(&self, _stage: Stage) {}
}
