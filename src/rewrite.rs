// src/rewrite.rs
// =============================================================================
// This module writes archive references into a document's text.
//
// How it works:
// 1. Turn every (occurrence, record) pair that gained a snapshot into an
//    Edit: "insert ` [Archived](snapshot)` at byte N"
// 2. Check every edit against the text it is about to touch
// 3. Copy the original text into a new String, splicing the insertions in
//    as we pass their offsets
//
// Offsets always refer to the ORIGINAL text, so earlier insertions can't
// shift later ones. Everything between edits is copied byte-for-byte
// (whitespace, CRLF line endings, odd markdown and all).
//
// The inserted text sits right after the original link and is folded back
// into the occurrence by the extractor next time, so a second run sees the
// link as archived and leaves it alone:
// - markdown links get ` [Archived](snapshot)`
// - <a href> anchors get ` <a href="snapshot">Archived</a>`, because inside
//   an HTML block markdown is not parsed and only another anchor is seen
// =============================================================================

use crate::archive::ArchiveRecord;
use crate::checker::{snapshot_fingerprint, LinkKind, LinkOccurrence};

/// One insertion into the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub insert: String,
}

/// The edits don't fit the text they're applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct RewriteConflict {
    pub reason: String,
}

impl RewriteConflict {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Markdown inserted after a link to record its snapshot.
pub fn archive_reference(snapshot: &str) -> String {
    let needs_brackets = snapshot
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>'));
    if needs_brackets {
        let escaped = snapshot.replace('<', "%3C").replace('>', "%3E");
        format!(" [Archived](<{escaped}>)")
    } else {
        format!(" [Archived]({snapshot})")
    }
}

/// HTML anchor inserted after an `<a href>` link to record its snapshot.
pub fn html_archive_reference(snapshot: &str) -> String {
    let escaped = snapshot.replace('"', "%22").replace('<', "%3C").replace('>', "%3E");
    format!(r#" <a href="{escaped}">Archived</a>"#)
}

fn reference_for(kind: LinkKind, snapshot: &str) -> String {
    match kind {
        LinkKind::Html => html_archive_reference(snapshot),
        LinkKind::Inline | LinkKind::Reference | LinkKind::Autolink | LinkKind::Bare => {
            archive_reference(snapshot)
        }
    }
}

/// Edits for every occurrence that gained a snapshot, in document order.
///
/// Occurrences that already carry an archive reference never get an edit,
/// whatever their record says.
pub fn plan_edits(resolved: &[(LinkOccurrence, ArchiveRecord)]) -> Vec<Edit> {
    resolved
        .iter()
        .filter(|(occurrence, _)| !occurrence.is_archived())
        .filter_map(|(occurrence, record)| {
            record.archive_url().map(|snapshot| Edit {
                offset: occurrence.span.end,
                insert: reference_for(occurrence.kind, snapshot),
            })
        })
        .collect()
}

/// Applies `resolved` to `text` and returns the new text.
///
/// Fails without producing anything when an occurrence was extracted from a
/// different snapshot of the text, or an offset doesn't land inside it.
pub fn rewrite(
    text: &str,
    resolved: &[(LinkOccurrence, ArchiveRecord)],
) -> Result<String, RewriteConflict> {
    let fingerprint = snapshot_fingerprint(text);
    for (occurrence, record) in resolved {
        if record.archive_url().is_some() && occurrence.snapshot != fingerprint {
            return Err(RewriteConflict::new(format!(
                "occurrence of {} was extracted from a different version of the text",
                occurrence.url
            )));
        }
    }

    apply_edits(text, plan_edits(resolved))
}

/// Splices `edits` into `text` in a single forward pass.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> Result<String, RewriteConflict> {
    if edits.is_empty() {
        return Ok(text.to_string());
    }

    edits.sort_by_key(|edit| edit.offset);

    let mut previous: Option<usize> = None;
    for edit in &edits {
        if edit.offset > text.len() || !text.is_char_boundary(edit.offset) {
            return Err(RewriteConflict::new(format!(
                "offset {} is outside the text or inside a character",
                edit.offset
            )));
        }
        if previous == Some(edit.offset) {
            return Err(RewriteConflict::new(format!(
                "two insertions at offset {}",
                edit.offset
            )));
        }
        previous = Some(edit.offset);
    }

    let extra: usize = edits.iter().map(|edit| edit.insert.len()).sum();
    let mut output = String::with_capacity(text.len() + extra);
    let mut cursor = 0;
    for edit in &edits {
        output.push_str(&text[cursor..edit.offset]);
        output.push_str(&edit.insert);
        cursor = edit.offset;
    }
    output.push_str(&text[cursor..]);

    Ok(output)
}
