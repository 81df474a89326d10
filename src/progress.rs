use std::{fmt::Display, time::Duration};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::release::Stage;

/// Spinner that follows the release through its stages.
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.cyan} [{elapsed}] {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    pub fn set_stage(&self, stage: Stage) {
        self.bar.set_prefix(format!("[{}/{}]", stage.position(), Stage::COUNT));
        self.bar.set_message(stage.to_string());
    }

    pub fn finish<M: Display>(&self, msg: M) {
        self.bar.finish_with_message(style(msg).green().to_string());
    }

    pub fn abandon<M: Display>(&self, msg: M) {
        self.bar.abandon_with_message(style(msg).red().to_string());
    }
}
