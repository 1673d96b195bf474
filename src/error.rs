// src/error.rs
// =============================================================================
// Error types shared by the library-style modules.
//
// Only things that stop a whole document (or the whole run) are errors here.
// Per-link problems are ordinary values (LinkStatus, ArchiveRecord) and end up
// in the report instead.
//
// main.rs wraps these in anyhow for the final "Error: ..." message.
// =============================================================================

use std::path::PathBuf;

/// Top-level error type for link-archivist operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchivistError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Could not build or use the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Edits were computed against text that is no longer the document's text.
    #[error("rewrite conflict in {path:?}: {reason}")]
    RewriteConflict { path: PathBuf, reason: String },

    /// The run was cancelled from outside (Ctrl-C or --timeout).
    #[error("run cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchivistError>;

impl ArchivistError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn conflict(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::RewriteConflict {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
