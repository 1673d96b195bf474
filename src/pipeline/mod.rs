// src/pipeline/mod.rs
// =============================================================================
// This module runs the whole job over a wiki checkout.
//
// How it works:
// 1. Find every markdown page under the root
// 2. Process several pages at once; for each page:
//    - extract its links
//    - check liveness and resolve archive state for every link
//      (concurrently, but results are kept in document order)
//    - rewrite the text and write it back if anything changed
// 3. Fold every finished page into the run report
//
// A single semaphore caps how many links are being worked on across the
// whole run, however many pages are open at once.
//
// Cancellation (Ctrl-C or --timeout) stops the run between awaits. Pages
// that already finished are kept; pages in flight are dropped before their
// final rename, so no page is ever half written.
//
// Rust concepts:
// - Streams: buffered() keeps order, buffer_unordered() doesn't
// - tokio::select!: race the work against the shutdown signal
// - Arc<Semaphore>: shared concurrency limit
// =============================================================================

mod document;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};

use crate::archive::{ArchiveRecord, ArchiveResolver, Backpressure};
use crate::checker::{ArchiveMatcher, LinkOccurrence, LivenessChecker};
use crate::config::Config;
use crate::error::{ArchivistError, Result};
use crate::report::{ReportEntry, ReportReason, RunReport};
use crate::scan::find_markdown_files;

pub use document::{Document, DocumentState, ResolvedLink};

/// What a run is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Liveness, archive lookups and captures, rewrites.
    Archive,
    /// Liveness only. No archive calls, no writes.
    Check,
}

/// What happened to one page.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub state: DocumentState,
    pub links: usize,
    pub archive_links_added: usize,
    pub entries: Vec<ReportEntry>,
}

pub struct Orchestrator {
    matcher: ArchiveMatcher,
    checker: LivenessChecker,
    // None in check mode
    resolver: Option<ArchiveResolver>,
    permits: Arc<Semaphore>,
    link_concurrency: usize,
    document_concurrency: usize,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(config: &Config, mode: Mode) -> Result<Self> {
        config.validate()?;

        let resolver = match mode {
            Mode::Archive => Some(ArchiveResolver::new(
                &config.archive,
                Arc::new(Backpressure::new()),
            )?),
            Mode::Check => None,
        };

        // Links into our own snapshot base count as archive references too
        let snapshot_host = url::Url::parse(&config.archive.snapshot_base)
            .ok()
            .and_then(|base| base.host_str().map(str::to_string));
        let matcher = ArchiveMatcher::new(
            config
                .archive
                .archive_hosts
                .iter()
                .cloned()
                .chain(snapshot_host),
        );

        Ok(Self {
            matcher,
            checker: LivenessChecker::new(&config.liveness)?,
            resolver,
            permits: Arc::new(Semaphore::new(config.run.concurrency)),
            link_concurrency: config.run.concurrency,
            document_concurrency: config.run.document_concurrency,
            dry_run: config.run.dry_run || mode == Mode::Check,
        })
    }

    // Processes every page under `root` until done or until `shutdown`
    // resolves
    //
    // Returns: the run report; `cancelled` is set when shutdown won
    //
    // Errors: only when the root itself can't be scanned
    pub async fn run(&self, root: &Path, shutdown: impl Future<Output = ()>) -> Result<RunReport> {
        let files = find_markdown_files(root)?;
        info!(
            root = %root.display(),
            documents = files.len(),
            dry_run = self.dry_run,
            "starting run"
        );

        let mut report = RunReport::default();

        let work = stream::iter(files)
            .map(|path| self.process_document(path))
            .buffer_unordered(self.document_concurrency);
        tokio::pin!(work);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Prefer stopping over starting more work
                biased;

                _ = &mut shutdown => {
                    warn!("run cancelled, unfinished documents were left untouched");
                    report.cancelled = true;
                    break;
                }
                next = work.next() => match next {
                    Some(outcome) => report.add(outcome),
                    None => break,
                },
            }
        }

        if let Some(remaining) = self
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.backpressure().remaining())
        {
            warn!(
                remaining_secs = remaining.as_secs(),
                "archive service is still cooling down; some links were not archived"
            );
        }

        let report = report.finish();
        info!(
            documents = report.summary.documents,
            persisted = report.summary.persisted,
            conflicted = report.summary.conflicted,
            entries = report.entries.len(),
            "run finished"
        );
        Ok(report)
    }

    /// Takes one page through every state it can reach.
    pub async fn process_document(&self, path: PathBuf) -> DocumentOutcome {
        let span = info_span!("document", path = %path.display());
        self.drive(path).instrument(span).await
    }

    async fn drive(&self, path: PathBuf) -> DocumentOutcome {
        let mut doc = match Document::load(&path).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "skipping unreadable document");
                return skipped(path, e);
            }
        };

        doc.extract(&self.matcher);
        let links = doc.occurrences().len();
        let mut failure = None;

        if doc.state() == DocumentState::Extracted {
            let resolved = stream::iter(doc.occurrences().to_vec())
                .map(|occurrence| self.resolve_link(occurrence))
                .buffered(self.link_concurrency)
                .collect::<Vec<_>>()
                .await;
            doc.resolve(resolved);

            if let Err(e) = doc.rewrite() {
                warn!(error = %e, "rewrite refused");
                failure = Some(e);
            }
        }

        if doc.state() == DocumentState::Rewritten {
            if self.dry_run {
                info!(
                    added = doc.archive_links_added(),
                    "dry run, not writing document"
                );
            } else if let Err(e) = doc.persist() {
                warn!(error = %e, "could not write document");
                failure = Some(e);
            } else {
                info!(added = doc.archive_links_added(), "document updated");
            }
        }

        let mut entries = doc.report_entries();
        if doc.state() == DocumentState::Conflicted {
            entries.push(ReportEntry {
                document: path.clone(),
                url: None,
                reason: ReportReason::RewriteConflict {
                    detail: failure
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "edits did not fit the document text".into()),
                },
            });
        } else if let Some(e) = failure {
            entries.push(ReportEntry {
                document: path.clone(),
                url: None,
                reason: ReportReason::Unreadable {
                    detail: e.to_string(),
                },
            });
        }

        let archive_links_added = match doc.state() {
            DocumentState::Persisted => doc.archive_links_added(),
            _ => 0,
        };

        DocumentOutcome {
            path,
            state: doc.state(),
            links,
            archive_links_added,
            entries,
        }
    }

    // Liveness, then archive state, for one occurrence
    //
    // Holds one permit from the run-wide semaphore while it works.
    async fn resolve_link(&self, occurrence: LinkOccurrence) -> ResolvedLink {
        if occurrence.is_archived() {
            return ResolvedLink {
                occurrence,
                check: None,
                record: ArchiveRecord::NotApplicable,
            };
        }

        // The semaphore is never closed
        let _permit = self.permits.acquire().await.ok();

        let check = self.checker.check(&occurrence.url).await;
        let record = match &self.resolver {
            Some(resolver) => resolver.resolve(&occurrence, check.status).await,
            None => ArchiveRecord::NotApplicable,
        };

        ResolvedLink {
            occurrence,
            check: Some(check),
            record,
        }
    }
}

fn skipped(path: PathBuf, error: ArchivistError) -> DocumentOutcome {
    DocumentOutcome {
        entries: vec![ReportEntry {
            document: path.clone(),
            url: None,
            reason: ReportReason::Unreadable {
                detail: error.to_string(),
            },
        }],
        path,
        state: DocumentState::Skipped,
        links: 0,
        archive_links_added: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.liveness.timeout_secs = 5;
        config.liveness.retry_backoff_ms = 10;
        config.archive.availability_endpoint = format!("{}/wayback/available", server.uri());
        config.archive.save_endpoint = format!("{}/save", server.uri());
        config.archive.status_endpoint = format!("{}/save/status", server.uri());
        // Snapshot URLs are only ever written, never fetched
        config.archive.snapshot_base = "https://web.archive.org/web".into();
        config.archive.poll_interval_ms = 10;
        config.archive.max_poll_interval_ms = 20;
        config.archive.session_retry_ms = 10;
        config
    }

    async fn mount_no_snapshot(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/wayback/available"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "archived_snapshots": {} })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_full_run_rewrites_live_links_and_reports_dead_ones() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("HEAD"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_no_snapshot(&server).await;
        Mock::given(method("POST"))
            .and(path("/save"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "timestamp": "20240101000000" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let live_page = dir.path().join("Live.md");
        let dead_page = dir.path().join("Dead.md");
        let empty_page = dir.path().join("Empty.md");
        fs::write(&live_page, format!("See [docs]({uri}/docs) for details.\n")).unwrap();
        fs::write(&dead_page, format!("[dead]({uri}/gone)\n")).unwrap();
        fs::write(&empty_page, "# No links\n").unwrap();

        let orchestrator = Orchestrator::new(&test_config(&server), Mode::Archive).unwrap();
        let report = orchestrator
            .run(dir.path(), std::future::pending())
            .await
            .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.summary.documents, 3);
        assert_eq!(report.summary.persisted, 1);
        assert_eq!(report.summary.unchanged, 2);
        assert_eq!(report.summary.archive_links_added, 1);

        assert_eq!(
            fs::read_to_string(&live_page).unwrap(),
            format!(
                "See [docs]({uri}/docs) [Archived](https://web.archive.org/web/20240101000000/{uri}/docs) for details.\n"
            )
        );
        assert_eq!(fs::read_to_string(&dead_page).unwrap(), format!("[dead]({uri}/gone)\n"));
        assert_eq!(fs::read_to_string(&empty_page).unwrap(), "# No links\n");

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].document, dead_page);
        assert_eq!(report.entries[0].url, Some(format!("{uri}/gone")));
        assert!(matches!(report.entries[0].reason, ReportReason::Dead { .. }));

        // A second run finds everything archived and touches nothing
        let again = orchestrator
            .run(dir.path(), std::future::pending())
            .await
            .unwrap();
        assert_eq!(again.summary.persisted, 0);
        assert_eq!(again.summary.archive_links_added, 0);
        assert!(fs::read_to_string(&live_page)
            .unwrap()
            .contains("[Archived]"));
    }

    #[tokio::test]
    async fn test_archived_links_make_no_requests() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("Page.md");
        let text = format!(
            "[docs]({uri}/docs) [Archived](https://web.archive.org/web/2019/{uri}/docs)\n"
        );
        fs::write(&page, &text).unwrap();

        let orchestrator = Orchestrator::new(&test_config(&server), Mode::Archive).unwrap();
        let report = orchestrator
            .run(dir.path(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.summary.unchanged, 1);
        assert!(report.entries.is_empty());
        assert_eq!(fs::read_to_string(&page).unwrap(), text);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        mount_no_snapshot(&server).await;
        Mock::given(method("POST"))
            .and(path("/save"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "timestamp": "20240101000000" })),
            )
            .mount(&server)
            .await;

        let uri = server.uri();
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("Page.md");
        let text = format!("[docs]({uri}/docs)\n");
        fs::write(&page, &text).unwrap();

        let mut config = test_config(&server);
        config.run.dry_run = true;
        let orchestrator = Orchestrator::new(&config, Mode::Archive).unwrap();
        let report = orchestrator
            .run(dir.path(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.summary.persisted, 0);
        assert_eq!(fs::read_to_string(&page).unwrap(), text);
    }

    #[tokio::test]
    async fn test_check_mode_never_calls_the_archive() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wayback/available"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("Page.md");
        let text = format!("[docs]({uri}/docs) and [old]({uri}/gone)\n");
        fs::write(&page, &text).unwrap();

        let orchestrator = Orchestrator::new(&test_config(&server), Mode::Check).unwrap();
        let report = orchestrator
            .run(dir.path(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.entries.len(), 1);
        assert!(matches!(report.entries[0].reason, ReportReason::Dead { .. }));
        assert_eq!(fs::read_to_string(&page).unwrap(), text);
    }

    #[tokio::test]
    async fn test_cancelled_run_leaves_documents_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let uri = server.uri();
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("Page.md");
        let text = format!("[docs]({uri}/docs)\n");
        fs::write(&page, &text).unwrap();

        let orchestrator = Orchestrator::new(&test_config(&server), Mode::Archive).unwrap();
        let report = orchestrator
            .run(dir.path(), tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.summary.documents, 0);
        assert_eq!(fs::read_to_string(&page).unwrap(), text);
    }

    #[tokio::test]
    async fn test_non_utf8_document_is_skipped() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Binary.md"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let orchestrator = Orchestrator::new(&test_config(&server), Mode::Archive).unwrap();
        let report = orchestrator
            .run(dir.path(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.summary.skipped, 1);
        assert!(matches!(report.entries[0].reason, ReportReason::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_base_host_counts_as_archive() {
        let server = MockServer::start().await;
        let mut config = test_config(&server);
        config.archive.snapshot_base = "https://snapshots.example/web".into();
        config.archive.archive_hosts = vec!["mirror.example".into()];

        let orchestrator = Orchestrator::new(&config, Mode::Archive).unwrap();
        for archive in ["https://snapshots.example/web/1/x", "https://mirror.example/x"] {
            let url = url::Url::parse(archive).unwrap();
            assert!(orchestrator.matcher.is_archive_url(&url), "{archive}");
        }
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(&test_config(&server), Mode::Archive).unwrap();
        let result = orchestrator
            .run(&dir.path().join("missing"), std::future::pending())
            .await;
        assert!(result.is_err());
    }
}
