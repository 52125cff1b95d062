//! Progress reporting for consensus runs

use colored::Colorize;
use consensus_application::ports::progress::ProgressNotifier;
use consensus_domain::Stage;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress during a consensus run with progress bars on stderr
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn stage_display_name(stage: Stage) -> String {
        let number = match stage {
            Stage::Panel => 1,
            Stage::Critique => 2,
            Stage::Synthesis => 3,
        };
        format!("Stage {}: {}", number, stage.display_name())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::stage_style());
        pb.set_prefix(Self::stage_display_name(stage));
        pb.set_message("Starting...");

        if let Ok(mut slot) = self.stage_bar.lock() {
            *slot = Some(pb);
        }
    }

    fn on_task_complete(&self, _stage: Stage, persona_name: &str, success: bool) {
        if let Ok(slot) = self.stage_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            let status = if success {
                format!("{} {}", "v".green(), persona_name)
            } else {
                format!("{} {}", "x".red(), persona_name)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_stage_complete(&self, stage: Stage) {
        if let Ok(mut slot) = self.stage_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_with_message(format!("{} complete!", stage.display_name().green()));
        }
    }

    fn on_degraded(&self, reason: &str) {
        let _ = self
            .multi
            .println(format!("{} {}", "!".yellow().bold(), reason.yellow()));
    }
}

/// Simple text-based progress on stderr (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            ProgressReporter::stage_display_name(stage).bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _stage: Stage, persona_name: &str, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), persona_name);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), persona_name);
        }
    }

    fn on_stage_complete(&self, _stage: Stage) {
        eprintln!();
    }

    fn on_degraded(&self, reason: &str) {
        eprintln!("{} {}", "!".yellow().bold(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(
            ProgressReporter::stage_display_name(Stage::Panel),
            "Stage 1: Expert Panel"
        );
        assert_eq!(
            ProgressReporter::stage_display_name(Stage::Synthesis),
            "Stage 3: Synthesis"
        );
    }

    #[test]
    fn test_reporter_tracks_one_stage_at_a_time() {
        let reporter = ProgressReporter::new();
        reporter.on_stage_start(Stage::Panel, 3);
        reporter.on_task_complete(Stage::Panel, "analyst", true);
        assert_eq!(
            reporter.stage_bar.lock().unwrap().as_ref().map(|pb| pb.position()),
            Some(1)
        );
        reporter.on_stage_complete(Stage::Panel);
        assert!(reporter.stage_bar.lock().unwrap().is_none());
    }
}
