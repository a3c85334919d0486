use console::{Emoji, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::path::Path;

use crate::catalog::{Manifest, Side};
use crate::job::JobSpec;

static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
static UP: Emoji<'_, '_> = Emoji("⬆️  ", "^ ");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "ok ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "x ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
static CLOUD: Emoji<'_, '_> = Emoji("☁️  ", "");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Outcome of one run: per-slot counters plus the manifest they produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub uploaded: usize,
    pub failed: usize,
    pub manifest: Manifest,
}

impl RunReport {
    /// Number of store attempts made, one per non-empty slot
    pub fn attempts(&self) -> usize {
        self.uploaded + self.failed
    }
}

/// Human-readable progress output for a run.
///
/// Lines are routed through the progress bar while it is visible so they do
/// not tear it; a quiet log prints nothing at all.
pub struct StatusLog {
    bar: Option<ProgressBar>,
}

impl StatusLog {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} items")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar: Some(bar) }
    }

    pub fn quiet() -> Self {
        Self { bar: None }
    }

    fn line(&self, message: impl Display) {
        match &self.bar {
            Some(bar) if bar.is_hidden() => println!("{}", message),
            Some(bar) => bar.println(message.to_string()),
            None => {}
        }
    }

    fn rule(&self, ch: &str) {
        self.line(style(ch.repeat(60)).dim());
    }

    pub fn header(&self, job: &JobSpec, target: &str) {
        self.line("");
        self.rule("=");
        self.line(
            style(format!("{}PROCESSING {}", PACKAGE, job.category.to_uppercase()))
                .cyan()
                .bold(),
        );
        self.line(format!("{}Source: {}", FOLDER, style(job.source.display()).green()));
        self.line(format!("{}Target: {}", CLOUD, style(target).green()));
        self.rule("=");
    }

    /// Begin a job's progress, reviving a bar finished by an earlier job
    pub fn start(&self, items: usize) {
        if let Some(bar) = &self.bar {
            bar.reset();
            bar.set_length(items as u64);
        }
    }

    pub fn advance(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn item(&self, name: &str) {
        self.line("");
        self.line(format!("{}Processing: {}", PACKAGE, style(name).bold()));
    }

    pub fn attempt(&self, side: Side, file_name: &str) {
        self.line(format!("  {}Uploading {}: {}...", UP, side, file_name));
    }

    pub fn success(&self, side: Side, url: &str) {
        self.line(format!(
            "  {}{} uploaded: {}",
            CHECK,
            capitalize(&side.to_string()),
            style(url).dim()
        ));
    }

    pub fn failure(&self, side: Side, file_name: &str, reason: impl Display) {
        self.line(format!(
            "  {}{}",
            CROSS,
            style(format!("Failed to upload {} {}: {}", side, file_name, reason)).red()
        ));
    }

    pub fn warn(&self, message: impl Display) {
        self.line(format!("  {}{}", WARN, style(message).yellow()));
    }

    pub fn planned(&self, side: Side, file_name: &str, destination: &str) {
        self.line(format!(
            "  {} {}: {} → {}",
            style("WOULD UPLOAD").green().bold(),
            side,
            file_name,
            destination
        ));
    }

    /// Final block for one run. `saved` is false when the manifest could not be written.
    pub fn summary(&self, job: &JobSpec, report: &RunReport, saved: bool) {
        self.line("");
        self.rule("=");
        if saved {
            self.line(style(format!("{}{} upload complete!", CHECK, job.category)).bold());
        } else {
            self.line(style(format!("{}{} upload aborted", CROSS, job.category)).red().bold());
        }
        self.line(format!("📊 Total Uploaded: {} images", report.uploaded));
        self.line(format!("{}Total Failed: {} images", CROSS, report.failed));
        if saved {
            self.line(format!("{}URLs saved to: {}", DISK, job.output.display()));
        } else {
            self.line(
                style(format!(
                    "{}URLs NOT saved: {} could not be written",
                    DISK,
                    job.output.display()
                ))
                .red(),
            );
        }
        self.rule("=");
    }

    /// Totals across every run of a batch
    pub fn grand_total(&self, runs: &[(String, RunReport)]) {
        self.line("");
        self.rule("=");
        self.line(style("🎉 GRAND TOTAL").bold());
        self.rule("=");
        for (category, report) in runs {
            self.line(format!(
                "{}: {} uploaded, {} failed",
                category, report.uploaded, report.failed
            ));
        }
        let uploaded: usize = runs.iter().map(|(_, r)| r.uploaded).sum();
        self.line(style(format!("TOTAL: {} images uploaded", uploaded)).bold());
        self.rule("=");
    }

    pub fn dry_run_banner(&self, output: &Path) {
        self.line(
            style(format!(
                "🔍 DRY RUN MODE - nothing will be uploaded and {} will not be written",
                output.display()
            ))
            .yellow()
            .bold(),
        );
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
