// src/checker/mod.rs
// =============================================================================
// This module contains the per-link logic that doesn't talk to the archive.
//
// Submodules:
// - markdown: Finds link occurrences (with byte spans) in a wiki page
// - http: Decides whether a URL is Live, Dead or Unknown
//
// This file (mod.rs) is the module root - it re-exports the public API so
// callers can write `checker::extract_links()` instead of
// `checker::markdown::extract_links()`.
// =============================================================================

mod http;
mod markdown;

pub use http::{LinkCheckResult, LinkStatus, LivenessChecker};
pub use markdown::{
    extract_links, snapshot_fingerprint, ArchiveMatcher, LinkKind, LinkOccurrence, ParseIssue,
};
