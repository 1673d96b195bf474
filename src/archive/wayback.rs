// src/archive/wayback.rs
// =============================================================================
// HTTP client for the Wayback Machine.
//
// Three endpoints:
// - availability: "is there already a snapshot of this URL?" (read-only)
// - save:         "please capture this URL" (Save Page Now)
// - save/status:  "is capture job <id> finished yet?"
//
// Every request goes through `send()`, which:
// 1. Refuses to go out while the run-wide cool-down is active
// 2. Trips the cool-down when the service answers 429
//
// Response bodies are parsed into small serde structs. Fields the service
// sometimes leaves out are Option<T> or #[serde(default)].
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::backpressure::Backpressure;
use super::ArchiveFailure;
use crate::config::ArchiveConfig;
use crate::error::Result;

/// Service status code for "this host was captured too often today".
pub const DAILY_HOST_LIMIT: &str = "error:too-many-daily-captures-host";

/// Service status code for "too many captures running for this account".
pub const SESSION_LIMIT: &str = "error:user-session-limit";

/// Answer to a capture submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The service captured the page straight away.
    Done { snapshot: String },
    /// The capture was queued; poll the job.
    Queued { job_id: String },
    /// Too many captures in flight for our session; try again shortly.
    SessionLimited,
}

/// Answer to a job status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Success { timestamp: String },
    Failed { code: String, message: String },
}

// { "archived_snapshots": { "closest": { "available": true, "url": "..." } } }
#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    available: bool,
    url: String,
}

// Both the save and the status endpoints answer with a subset of these.
#[derive(Debug, Default, Deserialize)]
struct CaptureResponse {
    job_id: Option<String>,
    status: Option<String>,
    status_ext: Option<String>,
    message: Option<String>,
    timestamp: Option<String>,
    url: Option<String>,
}

/// Thin wrapper around the archive service's HTTP API.
pub struct WaybackClient {
    client: Client,
    availability_endpoint: String,
    save_endpoint: String,
    status_endpoint: String,
    snapshot_base: String,
    authorization: Option<String>,
    cooldown: Duration,
    backpressure: Arc<Backpressure>,
}

impl WaybackClient {
    pub fn new(config: &ArchiveConfig, backpressure: Arc<Backpressure>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("link-archivist/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            availability_endpoint: config.availability_endpoint.clone(),
            save_endpoint: config.save_endpoint.clone(),
            status_endpoint: config.status_endpoint.trim_end_matches('/').to_string(),
            snapshot_base: config.snapshot_base.trim_end_matches('/').to_string(),
            authorization: config.authorization(),
            cooldown: config.cooldown(),
            backpressure,
        })
    }

    /// Snapshot URL for a capture taken at `timestamp`.
    pub fn snapshot_url(&self, timestamp: &str, url: &str) -> String {
        format!("{}/{}/{}", self.snapshot_base, timestamp, url)
    }

    /// Most recent existing snapshot of `url`, if any.
    pub async fn lookup(&self, url: &str) -> std::result::Result<Option<String>, ArchiveFailure> {
        let request = self
            .client
            .get(&self.availability_endpoint)
            .query(&[("url", url)]);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(http_failure(response.status()));
        }

        let body: AvailabilityResponse = response.json().await.map_err(bad_response)?;
        Ok(body
            .archived_snapshots
            .closest
            .filter(|snapshot| snapshot.available)
            .map(|snapshot| canonical_snapshot_url(&snapshot.url)))
    }

    /// Ask the service to capture `url`.
    pub async fn submit(&self, url: &str) -> std::result::Result<Submission, ArchiveFailure> {
        let request = self
            .client
            .post(&self.save_endpoint)
            .form(&[("url", url), ("skip_first_archive", "1")]);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(http_failure(response.status()));
        }

        let body: CaptureResponse = response.json().await.map_err(bad_response)?;
        debug!(url, ?body, "capture request response");

        if let Some(job_id) = body.job_id {
            return Ok(Submission::Queued { job_id });
        }

        if body.status.as_deref() == Some("error") {
            let code = body.status_ext.unwrap_or_else(|| "error:unknown".into());
            return match code.as_str() {
                SESSION_LIMIT => Ok(Submission::SessionLimited),
                DAILY_HOST_LIMIT => Err(ArchiveFailure::DailyHostLimit {
                    host: host_of(url).unwrap_or_default(),
                }),
                _ => Err(ArchiveFailure::Service {
                    code,
                    message: body.message.unwrap_or_default(),
                }),
            };
        }

        // Synchronous completion: either a capture timestamp or a ready URL
        if let Some(timestamp) = body.timestamp {
            return Ok(Submission::Done {
                snapshot: self.snapshot_url(&timestamp, url),
            });
        }
        if let Some(snapshot) = body.url.filter(|u| u.contains("/web/")) {
            return Ok(Submission::Done {
                snapshot: canonical_snapshot_url(&snapshot),
            });
        }

        Err(ArchiveFailure::BadResponse {
            message: "capture response had neither a job id nor a snapshot".into(),
        })
    }

    /// Current state of a queued capture job.
    pub async fn job_status(&self, job_id: &str) -> std::result::Result<JobStatus, ArchiveFailure> {
        let request = self
            .client
            .get(format!("{}/{}", self.status_endpoint, job_id));
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(http_failure(response.status()));
        }

        let body: CaptureResponse = response.json().await.map_err(bad_response)?;
        match body.status.as_deref() {
            Some("pending") => Ok(JobStatus::Pending),
            Some("success") => match body.timestamp {
                Some(timestamp) => Ok(JobStatus::Success { timestamp }),
                None => Err(ArchiveFailure::BadResponse {
                    message: "successful job without a timestamp".into(),
                }),
            },
            Some("error") => Ok(JobStatus::Failed {
                code: body.status_ext.unwrap_or_else(|| "error:unknown".into()),
                message: body.message.unwrap_or_default(),
            }),
            other => Err(ArchiveFailure::BadResponse {
                message: format!("unexpected job status {other:?}"),
            }),
        }
    }

    // Sends one request, honouring and maintaining the run-wide cool-down.
    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, ArchiveFailure> {
        if self.backpressure.is_tripped() {
            return Err(ArchiveFailure::CoolingDown);
        }

        let mut request = request.header(ACCEPT, "application/json");
        if let Some(auth) = &self.authorization {
            request = request.header(AUTHORIZATION, auth.as_str());
        }

        let response = request.send().await.map_err(|e| ArchiveFailure::Network {
            message: e.to_string(),
        })?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let cooldown = retry_after(&response).map_or(self.cooldown, |wait| wait.max(self.cooldown));
            self.backpressure.trip(cooldown);
            return Err(ArchiveFailure::RateLimited);
        }

        Ok(response)
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn http_failure(status: StatusCode) -> ArchiveFailure {
    ArchiveFailure::Service {
        code: format!("HTTP {}", status.as_u16()),
        message: status.canonical_reason().unwrap_or("").to_string(),
    }
}

fn bad_response(error: reqwest::Error) -> ArchiveFailure {
    ArchiveFailure::BadResponse {
        message: error.to_string(),
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

// The availability API hands out http:// snapshot links; the wiki uses https.
fn canonical_snapshot_url(url: &str) -> String {
    match url.strip_prefix("http://web.archive.org/") {
        Some(rest) => format!("https://web.archive.org/{rest}"),
        None => url.to_string(),
    }
}
