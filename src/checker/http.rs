// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when the server refuses HEAD (405 / 501)
// - Sorts every outcome into Live, Dead or Unknown
// - Retries an Unknown outcome once after a short wait
//
// Only 404, 410 and DNS failures are Dead. Timeouts, 5xx, 429, bot walls
// (403) and flaky connections are Unknown: a page that is merely having a bad
// day must never be reported as a dead link.
//
// Rust concepts:
// - async/await: For concurrent network I/O
// - Enums: To represent different link states
// - Error source chains: To find the DNS failure buried inside reqwest's error
// =============================================================================

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LivenessConfig;
use crate::error::Result;

// Represents the status of a link after checking
//
// #[derive(Serialize, Deserialize)] lets us convert to/from JSON
// #[derive(Debug, Clone)] enables debugging and cloning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Final response was 2xx (after following redirects)
    Live,
    /// 404, 410 or the hostname does not resolve
    Dead,
    /// Anything we can't be sure about (timeouts, 5xx, 429, ...)
    Unknown,
}

// Represents the result of checking a single link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    pub status: LinkStatus,
    /// Final HTTP status code, if we got a response at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Decides whether outbound links still resolve.
///
/// The client is cloned into every task (reqwest clients are reference
/// counted, so clones share one connection pool).
#[derive(Clone)]
pub struct LivenessChecker {
    client: Client,
    retry_backoff: Duration,
}

impl LivenessChecker {
    pub fn new(config: &LivenessConfig) -> Result<Self> {
        Self::build(
            config.timeout(),
            config.max_redirects,
            config.retry_backoff(),
            &config.user_agent,
        )
    }

    fn build(
        timeout: Duration,
        max_redirects: usize,
        retry_backoff: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            retry_backoff,
        })
    }

    // Checks a single link, retrying once if the answer is Unknown
    //
    // A second Unknown is accepted as final for this run; the next run
    // will look at the link again.
    pub async fn check(&self, url: &str) -> LinkCheckResult {
        let first = self.check_once(url).await;
        if first.status != LinkStatus::Unknown {
            return first;
        }

        debug!(url, message = ?first.message, "liveness unknown, retrying once");
        tokio::time::sleep(self.retry_backoff).await;
        self.check_once(url).await
    }

    async fn check_once(&self, url: &str) -> LinkCheckResult {
        // First, try a HEAD request (faster, no body download)
        let result = match self.client.head(url).send().await {
            // Some servers reject HEAD outright; ask again with GET
            Ok(response) if needs_get_fallback(response.status()) => {
                debug!(url, status = response.status().as_u16(), "HEAD refused, falling back to GET");
                self.client.get(url).send().await
            }
            other => other,
        };

        match result {
            Ok(response) => analyze_response(url, response.status()),
            Err(e) => categorize_error(url, &e),
        }
    }
}

fn needs_get_fallback(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

/// Maps a final HTTP status code onto a LinkStatus.
///
/// Redirects have already been followed by reqwest, so a 3xx here means the
/// chain could not be resolved (no Location header, 304, ...).
pub fn classify_status(status: StatusCode) -> LinkStatus {
    if status.is_success() {
        LinkStatus::Live
    } else if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
        LinkStatus::Dead
    } else {
        LinkStatus::Unknown
    }
}

// Analyzes an HTTP response to determine link status
fn analyze_response(url: &str, status_code: StatusCode) -> LinkCheckResult {
    let status = classify_status(status_code);
    let message = match status_code {
        StatusCode::TOO_MANY_REQUESTS => format!("HTTP {} (rate limited)", status_code.as_u16()),
        code if code.is_redirection() => format!("HTTP {} (unresolved redirect)", code.as_u16()),
        code => format!("HTTP {}", code.as_u16()),
    };

    LinkCheckResult {
        url: url.to_string(),
        status,
        http_status: Some(status_code.as_u16()),
        message: Some(message),
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(url: &str, error: &reqwest::Error) -> LinkCheckResult {
    let (status, message) = if error.is_timeout() {
        (LinkStatus::Unknown, "Request timed out".to_string())
    } else if error.is_redirect() {
        (LinkStatus::Unknown, "Too many redirects".to_string())
    } else if is_dns_failure(error) {
        (LinkStatus::Dead, "Could not resolve hostname".to_string())
    } else if error.is_connect() {
        (LinkStatus::Unknown, "Connection failed".to_string())
    } else {
        (LinkStatus::Unknown, error.to_string())
    };

    LinkCheckResult {
        url: url.to_string(),
        status,
        http_status: None,
        message: Some(message),
    }
}

// reqwest's own Display text says "error sending request"; the resolver's
// message sits a few levels down the source() chain.
fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        let text = err.to_string().to_ascii_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
            || text.contains("no such host")
        {
            return true;
        }
        source = err.source();
    }
    false
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why HEAD first?
//    - HEAD asks for the headers only, so no page body is downloaded
//    - Some servers answer HEAD with 405 Method Not Allowed, so we ask again
//      with GET (and still never read the body)
//
// 2. What is Option<&(dyn std::error::Error + 'static)>?
//    - A "trait object": a reference to any type implementing Error
//    - err.source() returns the error that caused this one (if any)
//    - Looping over source() walks the whole chain of causes
//
// 3. Why #[derive(Clone)] on LivenessChecker?
//    - Each concurrent task gets its own copy
//    - reqwest::Client is an Arc internally, so cloning is cheap
// -----------------------------------------------------------------------------
