// src/scan/mod.rs
// =============================================================================
// This module finds the wiki pages to process.
//
// Features:
// - Recursive walk (jwalk) starting from the workspace root
// - Only *.md files, in a stable sorted order
// - Hidden and symlinked directories are left alone
// =============================================================================

mod walk;

// Re-export the main scanning function
pub use walk::find_markdown_files;
