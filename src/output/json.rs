use serde::Serialize;
use std::path::Path;

use shibsynth::parsers::metadata::MetadataSummary;
use shibsynth::result::{ReportSummary, SynthesisReport};

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a SynthesisReport,
    summary: &'a ReportSummary,
}

#[derive(Serialize)]
struct JsonAnalysis<'a> {
    path: &'a Path,
    federation: bool,
    #[serde(flatten)]
    summary: &'a MetadataSummary,
}

#[derive(Serialize)]
struct JsonWritten<'a> {
    artifact: &'a str,
    path: &'a Path,
}

#[derive(Serialize)]
struct JsonContent<'a> {
    artifact: &'a str,
    content: &'a str,
}

pub fn print_report(report: &SynthesisReport, summary: &ReportSummary) {
    print_json(&JsonReport { report, summary });
}

pub fn print_analysis(path: &Path, summary: &MetadataSummary) {
    print_json(&JsonAnalysis {
        path,
        federation: summary.is_federation(),
        summary,
    });
}

pub fn print_written(artifact: &str, path: &Path) {
    print_json(&JsonWritten { artifact, path });
}

pub fn print_content(artifact: &str, content: &str) {
    print_json(&JsonContent { artifact, content });
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}
