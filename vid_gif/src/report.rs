//! Console output: per-attempt banners and the final summary.

use crate::size_fit::{Attempt, AttemptObserver, LoopResult};
use console::style;
use serde::Serialize;
use shared_utils::types::FileSize;
use std::fmt;
use std::path::Path;

/// GitHub rejects files above this outright.
pub const GITHUB_HARD_LIMIT: FileSize = FileSize::from_mb(100);
/// GitHub warns about files above this.
pub const GITHUB_SOFT_LIMIT: FileSize = FileSize::from_mb(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadVerdict {
    /// Within the requested ceiling; fine to embed in a README.
    Embeddable,
    OverTarget,
    NeedsLfs,
    TooLarge,
}

impl fmt::Display for UploadVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadVerdict::Embeddable => "ready for GitHub",
            UploadVerdict::OverTarget => "over target, but GitHub accepts it",
            UploadVerdict::NeedsLfs => "needs Git LFS",
            UploadVerdict::TooLarge => "too large for GitHub",
        })
    }
}

pub fn classify_for_github(size: FileSize, ceiling: FileSize) -> UploadVerdict {
    if size <= ceiling {
        UploadVerdict::Embeddable
    } else if size <= GITHUB_SOFT_LIMIT {
        UploadVerdict::OverTarget
    } else if size <= GITHUB_HARD_LIMIT {
        UploadVerdict::NeedsLfs
    } else {
        UploadVerdict::TooLarge
    }
}

/// Markdown image line pointing at the artifact's file name.
pub fn markdown_snippet(artifact: &Path) -> String {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| artifact.display().to_string());
    format!("![Demo]({})", name)
}

fn fmt_overshoot(ratio: f64) -> String {
    let text = format!("{:.2}x target", ratio);
    if ratio <= 1.0 {
        format!("{}", style(text).green().bold())
    } else if ratio <= 1.5 {
        format!("{}", style(text).yellow())
    } else {
        format!("{}", style(text).red())
    }
}

pub fn fmt_attempt(attempt: &Attempt, ceiling: FileSize) -> String {
    let mark = if attempt.fits() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    let mut line = format!(
        "   {} Attempt {} | {} | {} / {} ({})",
        mark,
        style(attempt.attempt_index + 1).cyan(),
        attempt.parameters,
        style(attempt.produced_size).blue(),
        ceiling,
        fmt_overshoot(attempt.overshoot_ratio)
    );
    if let Some(tier) = attempt.adjustment {
        line.push_str(&format!(" → {} adjustment", style(tier).dim()));
    }
    line
}

/// Prints one line per attempt to stderr.
#[derive(Debug, Default)]
pub struct AttemptBanner {
    printed: usize,
}

impl AttemptBanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printed(&self) -> usize {
        self.printed
    }
}

impl AttemptObserver for AttemptBanner {
    fn on_attempt(&mut self, attempt: &Attempt, ceiling: FileSize) {
        if self.printed == 0 {
            eprintln!("{}", style("═══ Fitting GIF under size limit ═══").cyan().bold());
        }
        eprintln!("{}", fmt_attempt(attempt, ceiling));
        self.printed += 1;
    }
}

pub fn summary_lines(result: &LoopResult, input_size: FileSize) -> Vec<String> {
    let mut lines = Vec::new();
    let verdict = classify_for_github(result.final_size, result.size_ceiling);

    if result.succeeded {
        lines.push(format!(
            "{} {}",
            style("✅").green(),
            style("GIF fits the size limit").green().bold()
        ));
    } else {
        lines.push(format!(
            "{} {} ({})",
            style("⚠️").yellow(),
            style("GIF is still over the size limit").yellow(),
            result.stop_reason
        ));
    }

    lines.push(format!("   Output: {}", result.final_artifact_path.display()));
    lines.push(format!(
        "   Size: {} → {} (limit {})",
        input_size, result.final_size, result.size_ceiling
    ));
    if let Some(reduction) = result.final_size.reduction_percent(input_size) {
        lines.push(format!("   Reduction: {:.1}%", reduction));
    }
    if let Some(params) = result.final_parameters() {
        lines.push(format!("   Settings: {}", params));
    }
    lines.push(format!(
        "   Attempts: {} | GitHub: {}",
        style(result.attempts.len()).cyan(),
        verdict
    ));
    if verdict == UploadVerdict::Embeddable {
        lines.push(format!(
            "   Markdown: {}",
            markdown_snippet(&result.final_artifact_path)
        ));
    }
    lines
}

pub fn print_result(result: &LoopResult, input_size: FileSize) {
    println!();
    for line in summary_lines(result, input_size) {
        println!("{}", line);
    }
}
