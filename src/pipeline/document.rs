// src/pipeline/document.rs
// =============================================================================
// One wiki page on its way through a run.
//
// States:
//   Scanned -> Extracted -> Resolved -> Rewritten -> Persisted
//                                               \--> Unchanged
//   any state before Persisted can drop into Conflicted (the text moved
//   under us) or Skipped (the file could not be read)
//
// The text read from disk is kept as `original` for the whole trip. Every
// offset, every edit and the final "did anything change?" check refer to it.
// Before writing, the file is read again; if it no longer matches `original`
// someone else edited it and we leave it alone.
// =============================================================================

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::archive::ArchiveRecord;
use crate::checker::{
    extract_links, ArchiveMatcher, LinkCheckResult, LinkOccurrence, LinkStatus, ParseIssue,
};
use crate::error::{ArchivistError, Result};
use crate::report::{ReportEntry, ReportReason};
use crate::rewrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Scanned,
    Extracted,
    Resolved,
    Rewritten,
    Unchanged,
    Persisted,
    Conflicted,
    Skipped,
}

/// Liveness and archive outcome for one occurrence.
///
/// `check` is None when the occurrence was already archived and nothing was
/// asked about it.
#[derive(Debug, Clone)]
pub struct ResolvedLink {
    pub occurrence: LinkOccurrence,
    pub check: Option<LinkCheckResult>,
    pub record: ArchiveRecord,
}

#[derive(Debug)]
pub struct Document {
    pub path: PathBuf,
    original: String,
    occurrences: Vec<LinkOccurrence>,
    issues: Vec<ParseIssue>,
    resolved: Vec<ResolvedLink>,
    rewritten: Option<String>,
    state: DocumentState,
}

impl Document {
    /// Reads `path` into a Scanned document.
    pub async fn load(path: &Path) -> Result<Self> {
        let original = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ArchivistError::io(path, e))?;
        Ok(Self::from_text(path, original))
    }

    pub fn from_text(path: impl Into<PathBuf>, original: String) -> Self {
        Self {
            path: path.into(),
            original,
            occurrences: Vec::new(),
            issues: Vec::new(),
            resolved: Vec::new(),
            rewritten: None,
            state: DocumentState::Scanned,
        }
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn occurrences(&self) -> &[LinkOccurrence] {
        &self.occurrences
    }

    /// New text after `rewrite`, if it differs from the original.
    pub fn rewritten(&self) -> Option<&str> {
        self.rewritten.as_deref()
    }

    fn advance(&mut self, to: DocumentState) {
        debug!(path = %self.path.display(), from = ?self.state, to = ?to, "document state");
        self.state = to;
    }

    // Scanned -> Extracted, or straight to Unchanged when there is nothing
    // to look at
    pub fn extract(&mut self, matcher: &ArchiveMatcher) {
        debug_assert_eq!(self.state, DocumentState::Scanned);
        let extraction = extract_links(&self.original, matcher);
        self.occurrences = extraction.occurrences;
        self.issues = extraction.issues;

        if self.occurrences.is_empty() {
            self.advance(DocumentState::Unchanged);
        } else {
            self.advance(DocumentState::Extracted);
        }
    }

    // Extracted -> Resolved
    //
    // `resolved` must hold one entry per occurrence, in document order.
    pub fn resolve(&mut self, resolved: Vec<ResolvedLink>) {
        debug_assert_eq!(self.state, DocumentState::Extracted);
        debug_assert_eq!(resolved.len(), self.occurrences.len());
        self.resolved = resolved;
        self.advance(DocumentState::Resolved);
    }

    // Resolved -> Rewritten (new text), Unchanged (same text) or Conflicted
    pub fn rewrite(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, DocumentState::Resolved);
        let pairs: Vec<(LinkOccurrence, ArchiveRecord)> = self
            .resolved
            .iter()
            .map(|link| (link.occurrence.clone(), link.record.clone()))
            .collect();

        match rewrite::rewrite(&self.original, &pairs) {
            Ok(text) if text == self.original => {
                self.advance(DocumentState::Unchanged);
                Ok(())
            }
            Ok(text) => {
                self.rewritten = Some(text);
                self.advance(DocumentState::Rewritten);
                Ok(())
            }
            Err(conflict) => {
                self.advance(DocumentState::Conflicted);
                Err(ArchivistError::conflict(&self.path, conflict.reason))
            }
        }
    }

    // Rewritten -> Persisted, or Conflicted when the file changed on disk
    //
    // The new text goes to a temporary file next to the page and is renamed
    // over it, so a reader never sees half a page. There is no await in here:
    // once started, a cancelled run can't interrupt it.
    pub fn persist(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, DocumentState::Rewritten);
        let Some(text) = self.rewritten.clone() else {
            self.advance(DocumentState::Unchanged);
            return Ok(());
        };

        let on_disk =
            std::fs::read_to_string(&self.path).map_err(|e| ArchivistError::io(&self.path, e))?;
        if on_disk != self.original {
            self.advance(DocumentState::Conflicted);
            return Err(ArchivistError::conflict(
                &self.path,
                "file changed on disk while its links were being resolved",
            ));
        }

        replace_file(&self.path, &text).map_err(|e| ArchivistError::io(&self.path, e))?;

        self.advance(DocumentState::Persisted);
        Ok(())
    }

    // Report entries for this document: parse issues, then links in
    // document order
    pub fn report_entries(&self) -> Vec<ReportEntry> {
        let mut entries: Vec<ReportEntry> = self
            .issues
            .iter()
            .map(|issue| ReportEntry {
                document: self.path.clone(),
                url: Some(issue.destination.clone()),
                reason: ReportReason::ParseError {
                    detail: issue.reason.clone(),
                },
            })
            .collect();

        for link in &self.resolved {
            entries.extend(link_entries(&self.path, link));
        }
        entries
    }

    /// Archive references this document gains when persisted.
    pub fn archive_links_added(&self) -> usize {
        if self.rewritten.is_none() {
            return 0;
        }
        rewrite::plan_edits(
            &self
                .resolved
                .iter()
                .map(|link| (link.occurrence.clone(), link.record.clone()))
                .collect::<Vec<_>>(),
        )
        .len()
    }
}

// Report entries produced by one resolved link (zero, one or two)
fn link_entries(document: &Path, link: &ResolvedLink) -> Vec<ReportEntry> {
    let mut entries = Vec::new();
    let url = Some(link.occurrence.url.clone());

    if let Some(check) = &link.check {
        let reason = match check.status {
            LinkStatus::Dead => Some(ReportReason::Dead {
                detail: check.message.clone(),
            }),
            LinkStatus::Unknown => Some(ReportReason::Unknown {
                detail: check.message.clone(),
            }),
            LinkStatus::Live => None,
        };
        if let Some(reason) = reason {
            entries.push(ReportEntry {
                document: document.to_path_buf(),
                url: url.clone(),
                reason,
            });
        }
    }

    if let ArchiveRecord::ArchiveFailed { reason } = &link.record {
        entries.push(ReportEntry {
            document: document.to_path_buf(),
            url,
            reason: ReportReason::ArchiveFailed {
                failure: reason.clone(),
            },
        });
    }

    entries
}

// Writes `text` to a temporary sibling and renames it over `path`. A failed
// write or rename never leaves the temporary file behind.
fn replace_file(path: &Path, text: &str) -> std::io::Result<()> {
    let temp = temp_path(path);
    let result = std::fs::write(&temp, text).and_then(|()| std::fs::rename(&temp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    result
}

// `.Page.md.link-archivist.tmp` next to `Page.md`
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.link-archivist.tmp"))
}
