// src/report.rs
// =============================================================================
// The run report: everything a human should look at after a run.
//
// Every link that could not be handled ends up here as a
// (document, url, reason) entry: dead links, links we could not reach,
// failed captures, malformed links and documents we refused to rewrite.
// Posting these as talk-page warnings is someone else's job; we only emit
// the data, as a table or as JSON.
// =============================================================================

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::archive::ArchiveFailure;
use crate::error::{ArchivistError, Result};
use crate::pipeline::{DocumentOutcome, DocumentState};

/// Why a link (or a whole document) is in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReportReason {
    /// 404, 410 or unresolvable host. Never archived.
    Dead { detail: Option<String> },
    /// Could not tell whether the link works (timeouts, 5xx, 429, ...).
    Unknown { detail: Option<String> },
    ArchiveFailed { failure: ArchiveFailure },
    /// Link syntax we could not turn into a URL.
    ParseError { detail: String },
    /// The document changed under us; left untouched.
    RewriteConflict { detail: String },
    /// The document could not be read or written.
    Unreadable { detail: String },
}

impl ReportReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dead { .. } => "DEAD",
            Self::Unknown { .. } => "UNKNOWN",
            Self::ArchiveFailed { .. } => "ARCHIVE FAILED",
            Self::ParseError { .. } => "PARSE ERROR",
            Self::RewriteConflict { .. } => "CONFLICT",
            Self::Unreadable { .. } => "UNREADABLE",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::Dead { detail } | Self::Unknown { detail } => detail.clone().unwrap_or_default(),
            Self::ArchiveFailed { failure } => failure.to_string(),
            Self::ParseError { detail }
            | Self::RewriteConflict { detail }
            | Self::Unreadable { detail } => detail.clone(),
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub document: PathBuf,
    /// Missing for document-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub reason: ReportReason,
}

/// Counters for the summary block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub documents: usize,
    pub persisted: usize,
    pub unchanged: usize,
    pub conflicted: usize,
    pub skipped: usize,
    pub links: usize,
    /// Archive references added to documents in this run.
    pub archive_links_added: usize,
}

/// Result of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub summary: Summary,
    pub entries: Vec<ReportEntry>,
    pub cancelled: bool,
}

impl RunReport {
    /// Folds one finished document into the report.
    pub fn add(&mut self, outcome: DocumentOutcome) {
        self.summary.documents += 1;
        self.summary.links += outcome.links;
        self.summary.archive_links_added += outcome.archive_links_added;
        match outcome.state {
            DocumentState::Persisted => self.summary.persisted += 1,
            DocumentState::Conflicted => self.summary.conflicted += 1,
            DocumentState::Skipped => self.summary.skipped += 1,
            _ => self.summary.unchanged += 1,
        }
        self.entries.extend(outcome.entries);
    }

    /// Entries sorted by document, keeping each document's link order.
    pub fn finish(mut self) -> Self {
        self.entries.sort_by(|a, b| a.document.cmp(&b.document));
        self
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Writes the JSON report to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ArchivistError::config(format!("could not serialize report: {e}")))?;
        std::fs::write(path, json).map_err(|e| ArchivistError::io(path, e))
    }
}

// Prints the results either as a table or JSON
pub fn print_results(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(report: &RunReport) {
    if report.entries.is_empty() {
        println!("✅ Nothing to report");
    } else {
        println!("{:<30} {:<50} {:<15} {:<30}", "DOCUMENT", "URL", "REASON", "DETAIL");
        println!("{}", "=".repeat(125));

        for entry in &report.entries {
            let document = entry.document.display().to_string();
            let url = entry.url.as_deref().unwrap_or("-");
            println!(
                "{:<30} {:<50} {:<15} {:<30}",
                truncate(&document, 30),
                truncate(url, 50),
                entry.reason.label(),
                entry.reason.detail()
            );
        }
    }

    println!();

    let summary = &report.summary;
    println!("📊 Summary:");
    println!("   📄 Documents: {}", summary.documents);
    println!("   ✏️  Rewritten: {}", summary.persisted);
    println!("   💤 Unchanged: {}", summary.unchanged);
    if summary.conflicted > 0 {
        println!("   ⚠️  Conflicted: {}", summary.conflicted);
    }
    if summary.skipped > 0 {
        println!("   🚫 Skipped: {}", summary.skipped);
    }
    println!("   🔗 Links: {}", summary.links);
    println!("   🗄️  Archive links added: {}", summary.archive_links_added);
    println!("   📋 Report entries: {}", report.entries.len());
    if report.cancelled {
        println!("   ⏹️  Run was cancelled before every document finished");
    }
}

// Truncate long values so the table stays aligned
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let cut: String = value.chars().take(width - 3).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}
