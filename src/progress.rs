//! Progress display for apply runs

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback, ResourceKind};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar that reports each resource as it completes
pub struct ApplyProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn print(&self, line: &str) {
        if self.quiet {
            return;
        }
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_apply_start(&mut self, total: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("  {spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("=>-"));
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, name: &str, kind: ResourceKind) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{name} ({kind})"));
        }
    }

    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult) {
        let line = match result {
            ApplyResult::Created => format!("  {} {}", "✓".green(), name),
            ApplyResult::Failed { error } => {
                format!("  {} {} {}", "✗".red(), name, error.dimmed())
            }
            ApplyResult::Skipped { reason } => {
                format!("  {} {} {}", "○".dimmed(), name, reason.dimmed())
            }
        };
        self.print(&line);
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_apply_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
