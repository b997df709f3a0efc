//! Terminal and NDJSON renderings of batch events

use chrono::Utc;
use clipfetch_core::{truncate, BatchEvent, BatchSummary, IntegrityReport, Reporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const RULE_WIDTH: usize = 80;
const LABEL_WIDTH: usize = 50;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn banner(title: &str) -> String {
    format!("{}\n{}\n{}", rule(), title, rule())
}

/// Status lines on stdout with a progress bar on stderr.
pub struct HumanReporter {
    bar: ProgressBar,
    total: AtomicUsize,
}

impl HumanReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self {
            bar,
            total: AtomicUsize::new(0),
        }
    }

    fn line(&self, text: String) {
        // Hidden bars swallow println, suspend does not
        self.bar.suspend(|| println!("{text}"));
    }
}

impl Reporter for HumanReporter {
    fn report(&self, event: &BatchEvent) {
        match event {
            BatchEvent::BatchStarted { total, workers, .. } => {
                self.total.store(*total, Ordering::Relaxed);
                self.bar.set_length(*total as u64);
                if *workers > 1 {
                    self.line(format!("Using {workers} parallel workers\n"));
                }
                self.bar.enable_steady_tick(std::time::Duration::from_millis(100));
            }
            BatchEvent::EntryStarted {
                index,
                total,
                id,
                label,
                retry,
            } => {
                let verb = if *retry { "Retrying" } else { "Processing" };
                self.line(format!(
                    "[{index}/{total}] {verb}: {id} - {}...",
                    truncate(label, LABEL_WIDTH)
                ));
            }
            BatchEvent::EntryFinished { retry, result, .. } => {
                let mark = if result.is_success() { "✓" } else { "✗" };
                self.line(format!("  {mark} {}", result.message));
                if !*retry {
                    self.bar.inc(1);
                }
            }
            BatchEvent::BatchFinished { summary } => {
                self.bar.finish_and_clear();
                println!("\n{}", render_summary(summary));
            }
            BatchEvent::IntegrityStarted { missing } => {
                println!("\n{}\n", banner("Integrity Check"));
                println!("⚠ Found {} missing files!", missing.len());
                println!("\nAttempting to download missing files...\n");
            }
            BatchEvent::IntegrityFinished { report } => {
                if report.missing.is_empty() {
                    println!("\n{}\n", banner("Integrity Check"));
                }
                println!("{}", render_integrity(report, self.total.load(Ordering::Relaxed)));
            }
            BatchEvent::IntegritySkipped => {}
        }
    }
}

pub fn render_summary(summary: &BatchSummary) -> String {
    let mut out = banner("Download Summary");
    out.push_str(&format!(
        "\n\n✓ Successful: {}/{}",
        summary.succeeded, summary.total
    ));
    if summary.already_present > 0 {
        out.push_str(&format!(" ({} already present)", summary.already_present));
    }
    out.push_str(&format!(
        "\n✗ Failed: {}/{}",
        summary.failed.len(),
        summary.total
    ));

    if !summary.failed.is_empty() {
        out.push_str("\n\nFailed downloads:");
        for failure in &summary.failed {
            out.push_str(&format!(
                "\n  - {}: {}...\n    Reason: {}",
                failure.id,
                truncate(&failure.label, LABEL_WIDTH),
                failure.message
            ));
        }
    }
    out
}

pub fn render_integrity(report: &IntegrityReport, total: usize) -> String {
    if report.missing.is_empty() {
        return format!("✓ All {total} files verified present!");
    }

    let mut out = format!(
        "\nRetry results: {}/{} successful",
        report.recovered(),
        report.missing.len()
    );
    if report.is_complete() {
        out.push_str("\n\n✓ All missing files successfully downloaded!");
    } else {
        out.push_str(&format!(
            "\n\nStill missing {} files after retry:",
            report.still_missing.len()
        ));
        for id in &report.still_missing {
            out.push_str(&format!("\n  - {id}"));
        }
    }
    out
}

/// One JSON object per event, each stamped with the time it was reported.
pub struct JsonReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> Reporter for JsonReporter<W> {
    fn report(&self, event: &BatchEvent) {
        let mut value = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Could not serialize event: {}", e);
                return;
            }
        };
        if let Some(object) = value.as_object_mut() {
            object.insert("ts".to_string(), Utc::now().to_rfc3339().into());
        }

        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{value}").and_then(|_| out.flush()) {
            tracing::warn!("Could not write event: {}", e);
        }
    }
}
