//! Human-readable run reports
//!
//! Formats a [`RunSummary`] for stderr according to the configured verbosity.

use std::time::Duration;

use crate::aggregator::RunSummary;
use crate::cli::VerbosityLevel;

/// Output formatter for run summaries
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stderr),
        }
    }

    /// Formatter that never emits ANSI escapes
    pub fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Full report: diagnostics first, then the summary when verbose
    pub fn format_results(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        if summary.has_errors() {
            output.push_str(&summary.message());
            output.push('\n');
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&self.format_summary(summary));
        }

        if self.verbosity == VerbosityLevel::Debug {
            output.push_str(&self.format_debug_info(summary));
        }

        output
    }

    fn format_summary(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        output.push_str("Run Summary:\n");
        output.push_str(&format!("  Archives: {}\n", summary.total_archives));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Success:", "32"),
            summary.successful_archives
        ));

        if summary.partial_archives > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Partial:", "33"),
                summary.partial_archives
            ));
        }
        if summary.failed_archives > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "31"),
                summary.failed_archives
            ));
        }

        output.push_str(&format!("  Documents: {}\n", summary.documents_written));
        output.push_str(&format!("  Object rows: {}\n", summary.object_rows_written));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(summary.total_duration)
        ));

        output
    }

    fn format_debug_info(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        output.push_str("\nPerformance Metrics:\n");
        output.push_str(&format!(
            "  Discovery: {}\n",
            format_duration(summary.discovery_duration)
        ));
        output.push_str(&format!(
            "  Processing: {}\n",
            format_duration(summary.processing_duration)
        ));
        output.push_str(&format!(
            "  Throughput: {:.1} archives/sec\n",
            summary.throughput()
        ));
        output.push_str(&format!(
            "  Concurrent archives: {}\n",
            summary.concurrent_archives
        ));
        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
