use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::SynthesisError;

/// Outcome of processing a single item (relationship, filter, attribute, artifact).
#[derive(Debug)]
pub enum ItemOutcome<T> {
    Ok(T),
    /// Item left out of this run; the run continues.
    Skipped(String),
    /// Item failed in a way the caller must see.
    Fatal(SynthesisError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Ok,
    Skipped,
    Fatal,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Ok => write!(f, "OK"),
            ItemStatus::Skipped => write!(f, "SKIPPED"),
            ItemStatus::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Attributes,
    Filters,
    Classification,
    Context,
    Render,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Attributes => write!(f, "Released attributes"),
            Stage::Filters => write!(f, "Filters & profiles"),
            Stage::Classification => write!(f, "Trust classification"),
            Stage::Context => write!(f, "Configuration context"),
            Stage::Render => write!(f, "Rendering"),
            Stage::Write => write!(f, "Writing"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportItem {
    pub stage: Stage,
    pub subject: String,
    pub status: ItemStatus,
    pub message: String,
}

impl ReportItem {
    pub fn ok(stage: Stage, subject: &str, message: &str) -> Self {
        Self::new(stage, subject, ItemStatus::Ok, message)
    }

    pub fn skipped(stage: Stage, subject: &str, reason: &str) -> Self {
        Self::new(stage, subject, ItemStatus::Skipped, reason)
    }

    pub fn fatal(stage: Stage, subject: &str, error: &SynthesisError) -> Self {
        Self::new(stage, subject, ItemStatus::Fatal, &error.to_string())
    }

    /// Record an outcome, using `ok_message` when it succeeded.
    pub fn from_outcome<T>(
        stage: Stage,
        subject: &str,
        outcome: &ItemOutcome<T>,
        ok_message: &str,
    ) -> Self {
        match outcome {
            ItemOutcome::Ok(_) => Self::ok(stage, subject, ok_message),
            ItemOutcome::Skipped(reason) => Self::skipped(stage, subject, reason),
            ItemOutcome::Fatal(e) => Self::fatal(stage, subject, e),
        }
    }

    fn new(stage: Stage, subject: &str, status: ItemStatus, message: &str) -> Self {
        Self {
            stage,
            subject: subject.to_string(),
            status,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub path: PathBuf,
    pub written: bool,
}

/// Aggregated result of one synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub generated_at: DateTime<Utc>,
    pub idp_root: Option<PathBuf>,
    pub context_built: bool,
    /// True only when every artifact of the set was written.
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub groups: Vec<GroupSummary>,
    pub items: Vec<ReportItem>,
    pub artifacts: Vec<ArtifactRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub description: String,
}

impl SynthesisReport {
    pub fn new(idp_root: Option<PathBuf>) -> Self {
        Self {
            generated_at: Utc::now(),
            idp_root,
            context_built: false,
            complete: false,
            error: None,
            groups: Vec::new(),
            items: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn fail(&mut self, error: &SynthesisError) {
        self.complete = false;
        self.error = Some(error.to_string());
    }

    pub fn is_success(&self) -> bool {
        self.complete
            && self.error.is_none()
            && !self.items.iter().any(|i| i.status == ItemStatus::Fatal)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_report(self)
    }
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub items: usize,
    pub ok: usize,
    pub skipped: usize,
    pub fatal: usize,
    pub artifacts_written: usize,
    pub artifacts_total: usize,
}

impl ReportSummary {
    pub fn from_report(report: &SynthesisReport) -> Self {
        let count = |status| report.items.iter().filter(|i| i.status == status).count();
        Self {
            items: report.items.len(),
            ok: count(ItemStatus::Ok),
            skipped: count(ItemStatus::Skipped),
            fatal: count(ItemStatus::Fatal),
            artifacts_written: report.artifacts.iter().filter(|a| a.written).count(),
            artifacts_total: report.artifacts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_by_status() {
        let mut report = SynthesisReport::new(None);
        report.items.push(ReportItem::ok(Stage::Filters, "a", "fine"));
        report
            .items
            .push(ReportItem::skipped(Stage::Classification, "b", "corrupt"));
        report.artifacts.push(ArtifactRecord {
            name: "relying-party.xml".to_string(),
            path: PathBuf::from("/tmp/relying-party.xml"),
            written: true,
        });
        report.complete = true;

        let summary = report.summary();
        assert_eq!(summary.items, 2);
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.fatal, 0);
        assert_eq!(summary.artifacts_written, 1);
        assert!(report.is_success());
    }

    #[test]
    fn fatal_item_fails_report() {
        let mut report = SynthesisReport::new(None);
        report.complete = true;
        let err = SynthesisError::Configuration("boom".to_string());
        report
            .items
            .push(ReportItem::from_outcome::<()>(
                Stage::Classification,
                "x",
                &ItemOutcome::Fatal(err),
                "",
            ));
        assert!(!report.is_success());
    }
}
