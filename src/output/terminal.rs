use colored::Colorize;
use std::path::Path;

use shibsynth::parsers::metadata::MetadataSummary;
use shibsynth::result::{ArtifactRecord, ItemStatus, ReportItem, ReportSummary, Stage, SynthesisReport};

pub fn print_report(report: &SynthesisReport, summary: &ReportSummary, verbose: bool) {
    let stages = [
        Stage::Attributes,
        Stage::Filters,
        Stage::Classification,
        Stage::Context,
        Stage::Render,
        Stage::Write,
    ];

    for stage in &stages {
        let items: Vec<_> = report
            .items
            .iter()
            .filter(|i| i.stage == *stage && (verbose || i.status != ItemStatus::Ok))
            .collect();
        if items.is_empty() {
            continue;
        }

        println!("\n{}", format!("── {} ──", stage).bold());
        for item in &items {
            print_item(item);
        }
    }

    if verbose && !report.groups.is_empty() {
        println!("\n{}", "── Parameter groups ──".bold());
        for group in &report.groups {
            println!("  {} {:<10} {}", "•".dimmed(), group.name, group.description.dimmed());
        }
    }

    println!();
    print_artifacts(&report.artifacts);
    if let Some(ref error) = report.error {
        println!("{} {}", "Error:".red().bold(), error);
    }
    println!();
    print_summary(report, summary);
}

fn print_item(item: &ReportItem) {
    let status = match item.status {
        ItemStatus::Ok => "OK".green().bold(),
        ItemStatus::Skipped => "SKIP".yellow().bold(),
        ItemStatus::Fatal => "FAIL".red().bold(),
    };
    println!("  {} {} {}", status, item.subject, item.message.dimmed());
}

fn print_artifacts(artifacts: &[ArtifactRecord]) {
    if artifacts.is_empty() {
        return;
    }

    println!("{}", "── Artifacts ──".bold());

    let max_name_len = artifacts.iter().map(|a| a.name.len()).max().unwrap_or(0);

    for artifact in artifacts {
        let icon = if artifact.written {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        println!(
            "  {} {:<width$}  {}",
            icon,
            artifact.name,
            artifact.path.display().to_string().dimmed(),
            width = max_name_len
        );
    }
}

fn print_summary(report: &SynthesisReport, summary: &ReportSummary) {
    let line = format!(
        "Summary: {}/{} artifacts written | {} ok | {} skipped | {} failed",
        summary.artifacts_written, summary.artifacts_total, summary.ok, summary.skipped, summary.fatal,
    );

    if !report.is_success() {
        println!("{}", line.red().bold());
    } else if summary.skipped > 0 {
        println!("{}", line.yellow().bold());
    } else {
        println!("{}", line.green().bold());
    }
}

pub fn print_analysis(path: &Path, summary: &MetadataSummary) {
    let kind = if summary.is_federation() {
        "federation aggregate"
    } else {
        "single entity"
    };
    println!("{} ({})", path.display().to_string().bold(), kind.dimmed());

    if summary.entity_ids.is_empty() {
        println!("  {}", "no entities".yellow());
        return;
    }
    for id in &summary.entity_ids {
        let role = if summary.sp_entity_ids.contains(id) {
            "[SP]".dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {} {} {}", "•".dimmed(), id, role);
    }
}

pub fn print_written(artifact: &str, path: &Path) {
    println!("{} {} {}", "✓".green(), artifact, path.display().to_string().dimmed());
}
