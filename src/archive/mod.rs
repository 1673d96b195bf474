// src/archive/mod.rs
// =============================================================================
// This module decides the archive state of one link occurrence.
//
// For a link with no archive reference yet:
// 1. Ask the archive service whether a snapshot already exists
// 2. If not, and the link is Live, submit a capture
// 3. If the capture was queued, poll its job until it finishes, fails,
//    or we run out of attempts
//
// Submodules:
// - wayback: the HTTP calls themselves
// - backpressure: the run-wide cool-down after a 429
//
// Rust concepts:
// - Enums with data: ArchiveRecord / ArchiveFailure carry their details
// - thiserror: gives ArchiveFailure a Display impl for the report
// - Explicit loops: polling is a `for` loop, not recursion
// =============================================================================

mod backpressure;
mod wayback;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checker::{LinkOccurrence, LinkStatus};
use crate::config::ArchiveConfig;
use crate::error::Result;

pub use backpressure::Backpressure;
pub use wayback::{JobStatus, Submission, WaybackClient};

/// Why a link could not be archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArchiveFailure {
    /// This link's request got a 429 and started the cool-down.
    #[error("archive service rate limited the run")]
    RateLimited,
    /// Another link already started the cool-down.
    #[error("skipped while the archive service cools down")]
    CoolingDown,
    #[error("capture still pending after {attempts} status checks")]
    Timeout { attempts: u32 },
    #[error("{host} is on the capture denylist")]
    Denylisted { host: String },
    #[error("{host} was captured too many times today")]
    DailyHostLimit { host: String },
    #[error("archive service reported {code}: {message}")]
    Service { code: String, message: String },
    #[error("archive request failed: {message}")]
    Network { message: String },
    #[error("unexpected archive response: {message}")]
    BadResponse { message: String },
}

/// Archive outcome for one occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum ArchiveRecord {
    /// The service already had a snapshot.
    AlreadyArchived { url: String },
    /// We captured a new snapshot in this run.
    NewlyArchived { url: String },
    ArchiveFailed { reason: ArchiveFailure },
    /// Nothing to do: already referenced, dead, or unreachable right now.
    NotApplicable,
}

impl ArchiveRecord {
    /// Snapshot URL the document should gain, if any.
    pub fn archive_url(&self) -> Option<&str> {
        match self {
            Self::AlreadyArchived { url } | Self::NewlyArchived { url } => Some(url),
            Self::ArchiveFailed { .. } | Self::NotApplicable => None,
        }
    }

    fn failed(reason: ArchiveFailure) -> Self {
        Self::ArchiveFailed { reason }
    }
}

/// Resolves archive state for occurrences, sharing one client and one
/// denylist across every worker in the run.
pub struct ArchiveResolver {
    client: WaybackClient,
    backpressure: Arc<Backpressure>,
    denylist: Mutex<HashSet<String>>,
    poll_interval: Duration,
    max_poll_interval: Duration,
    max_poll_attempts: u32,
    max_submit_attempts: u32,
    session_retry: Duration,
}

impl ArchiveResolver {
    pub fn new(config: &ArchiveConfig, backpressure: Arc<Backpressure>) -> Result<Self> {
        let client = WaybackClient::new(config, Arc::clone(&backpressure))?;
        let denylist = config
            .host_denylist
            .iter()
            .map(|host| host.to_ascii_lowercase())
            .collect();

        Ok(Self {
            client,
            backpressure,
            denylist: Mutex::new(denylist),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_interval: Duration::from_millis(config.max_poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
            max_submit_attempts: config.max_submit_attempts,
            session_retry: Duration::from_millis(config.session_retry_ms),
        })
    }

    pub fn backpressure(&self) -> &Arc<Backpressure> {
        &self.backpressure
    }

    /// Archive state for one occurrence, given its liveness.
    ///
    /// Never makes a network call for an occurrence that already carries an
    /// archive reference, or for a Dead link.
    pub async fn resolve(&self, occurrence: &LinkOccurrence, status: LinkStatus) -> ArchiveRecord {
        if occurrence.is_archived() {
            return ArchiveRecord::NotApplicable;
        }
        let url = occurrence.url.as_str();

        match status {
            LinkStatus::Dead => ArchiveRecord::NotApplicable,

            // Can't capture a page we can't reach, but an older snapshot is
            // still worth recording.
            LinkStatus::Unknown => match self.client.lookup(url).await {
                Ok(Some(snapshot)) => ArchiveRecord::AlreadyArchived { url: snapshot },
                Ok(None) => ArchiveRecord::NotApplicable,
                Err(e) => {
                    debug!(url, error = %e, "lookup for unreachable link failed");
                    ArchiveRecord::NotApplicable
                }
            },

            LinkStatus::Live => match self.client.lookup(url).await {
                Ok(Some(snapshot)) => {
                    debug!(url, snapshot = %snapshot, "found existing snapshot");
                    ArchiveRecord::AlreadyArchived { url: snapshot }
                }
                Ok(None) => self.capture(url).await,
                Err(e @ (ArchiveFailure::RateLimited | ArchiveFailure::CoolingDown)) => {
                    ArchiveRecord::failed(e)
                }
                Err(e) => {
                    // A broken lookup doesn't mean there's no snapshot to
                    // make; carry on and ask for a capture.
                    warn!(url, error = %e, "snapshot lookup failed, requesting capture anyway");
                    self.capture(url).await
                }
            },
        }
    }

    // Submits a capture and, if it was queued, polls it to completion.
    async fn capture(&self, url: &str) -> ArchiveRecord {
        if let Some(host) = self.denied_host(url) {
            return ArchiveRecord::failed(ArchiveFailure::Denylisted { host });
        }

        let mut attempt = 0;
        let job_id = loop {
            attempt += 1;
            match self.client.submit(url).await {
                Ok(Submission::Done { snapshot }) => {
                    info!(url, snapshot = %snapshot, "captured new snapshot");
                    return ArchiveRecord::NewlyArchived { url: snapshot };
                }
                Ok(Submission::Queued { job_id }) => break job_id,
                Ok(Submission::SessionLimited) if attempt < self.max_submit_attempts => {
                    debug!(url, attempt, "capture session limit reached, retrying");
                    tokio::time::sleep(self.session_retry).await;
                }
                Ok(Submission::SessionLimited) => {
                    return ArchiveRecord::failed(ArchiveFailure::Service {
                        code: wayback::SESSION_LIMIT.into(),
                        message: format!("still limited after {attempt} submissions"),
                    });
                }
                Err(ArchiveFailure::DailyHostLimit { host }) => {
                    self.deny(&host);
                    return ArchiveRecord::failed(ArchiveFailure::DailyHostLimit { host });
                }
                Err(e) => return ArchiveRecord::failed(e),
            }
        };

        self.poll(url, &job_id).await
    }

    // Polls a capture job with a growing delay between checks.
    async fn poll(&self, url: &str, job_id: &str) -> ArchiveRecord {
        let mut delay = self.poll_interval;

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(delay).await;
            debug!(url, job_id, attempt, "checking capture job");

            match self.client.job_status(job_id).await {
                Ok(JobStatus::Pending) => {}
                Ok(JobStatus::Success { timestamp }) => {
                    let snapshot = self.client.snapshot_url(&timestamp, url);
                    info!(url, snapshot = %snapshot, "captured new snapshot");
                    return ArchiveRecord::NewlyArchived { url: snapshot };
                }
                Ok(JobStatus::Failed { code, message }) => {
                    return ArchiveRecord::failed(ArchiveFailure::Service { code, message });
                }
                // A dropped connection mid-poll counts as one more pending tick
                Err(ArchiveFailure::Network { message }) => {
                    debug!(url, job_id, error = %message, "status check failed");
                }
                Err(e) => return ArchiveRecord::failed(e),
            }

            delay = next_poll_delay(delay, self.max_poll_interval);
        }

        ArchiveRecord::failed(ArchiveFailure::Timeout {
            attempts: self.max_poll_attempts,
        })
    }

    fn denied_host(&self, url: &str) -> Option<String> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
        let denylist = self.denylist.lock();
        denylist.contains(&host).then_some(host)
    }

    fn deny(&self, host: &str) {
        if host.is_empty() {
            return;
        }
        let mut denylist = self.denylist.lock();
        if denylist.insert(host.to_string()) {
            info!(host, "added host to capture denylist for this run");
        }
    }
}

// Doubles the poll delay up to `max`, without overflowing on huge configs
fn next_poll_delay(delay: Duration, max: Duration) -> Duration {
    delay.saturating_mul(2).min(max)
}
