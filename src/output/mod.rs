pub mod json;
pub mod terminal;

use std::path::Path;

use shibsynth::parsers::metadata::MetadataSummary;
use shibsynth::result::SynthesisReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

pub fn print_report(report: &SynthesisReport, verbose: bool, format: OutputFormat) {
    let summary = report.summary();

    match format {
        OutputFormat::Json => json::print_report(report, &summary),
        OutputFormat::Terminal => terminal::print_report(report, &summary, verbose),
    }
}

pub fn print_analysis(path: &Path, summary: &MetadataSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => json::print_analysis(path, summary),
        OutputFormat::Terminal => terminal::print_analysis(path, summary),
    }
}

/// Report a single file produced by a one-off command.
pub fn print_written(what: &str, path: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => json::print_written(what, path),
        OutputFormat::Terminal => terminal::print_written(what, path),
    }
}

/// Print generated content that is not written to disk.
pub fn print_content(what: &str, content: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => json::print_content(what, content),
        OutputFormat::Terminal => print!("{}", content),
    }
}
