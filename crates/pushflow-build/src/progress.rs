use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// ワークアイテム1件分のスピナー
pub struct BuildProgress {
    progress_bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(multi: &MultiProgress, item_name: &str) -> Self {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(item_name.to_string());
        pb.set_message("waiting...");
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { progress_bar: pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.progress_bar.set_message(msg.to_string());
    }

    pub fn finish_success(&self, image: &str) {
        self.progress_bar
            .finish_with_message(format!("pushed {} ✓", image));
    }

    pub fn finish_planned(&self, image: &str) {
        self.progress_bar
            .finish_with_message(format!("would push {}", image));
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .abandon_with_message(format!("failed: {}", error));
    }
}
