//! Step progress display
//!
//! A spinner per running step on stderr, hidden when output is streamed or
//! stderr is not a terminal.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::buildsys::BuildStep;

/// Progress display for one build attempt
pub struct StepProgress {
    total: usize,
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl StepProgress {
    pub fn new(total: usize, enabled: bool) -> Self {
        Self {
            total,
            enabled,
            bar: None,
        }
    }

    /// Show a spinner for a step that is about to run
    pub fn start(&mut self, index: usize, step: &BuildStep) {
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(format!("[{}/{}] {}", index + 1, self.total, step.label));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    pub fn fail(&mut self, step: &BuildStep) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("{}: FAILED", step.label));
        }
    }
}

impl Drop for StepProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
