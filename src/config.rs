// src/config.rs
// =============================================================================
// Configuration for a run.
//
// Values come from three places, later ones winning:
// 1. Built-in defaults (the functions at the bottom of each section)
// 2. An optional TOML file (`link-archivist.toml` or --config <path>)
// 3. CLI flags (applied in main.rs)
//
// Archive credentials are never stored in the file. The file only names the
// environment variables that hold them.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ArchivistError, Result};

/// Config file looked up in the working directory when --config is not given.
pub const DEFAULT_CONFIG_FILE: &str = "link-archivist.toml";

/// Top-level config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub liveness: LivenessConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

// ---------------------------------------------------------------------------
// [run]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum link resolutions in flight across all documents.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum documents processed at the same time.
    #[serde(default = "default_document_concurrency")]
    pub document_concurrency: usize,

    /// Compute everything but never write files.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            document_concurrency: default_document_concurrency(),
            dry_run: false,
        }
    }
}

fn default_concurrency() -> usize {
    8
}
fn default_document_concurrency() -> usize {
    4
}

// ---------------------------------------------------------------------------
// [liveness]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Redirect hops followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Wait before the single retry of an Unknown result, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            retry_backoff_ms: default_retry_backoff_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl LivenessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_max_redirects() -> usize {
    5
}
fn default_retry_backoff_ms() -> u64 {
    2_000
}
fn default_user_agent() -> String {
    concat!("link-archivist/", env!("CARGO_PKG_VERSION")).into()
}

// ---------------------------------------------------------------------------
// [archive]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Read-only snapshot lookup endpoint.
    #[serde(default = "default_availability_endpoint")]
    pub availability_endpoint: String,

    /// Capture submission endpoint.
    #[serde(default = "default_save_endpoint")]
    pub save_endpoint: String,

    /// Capture job status endpoint; the job id is appended as a path segment.
    #[serde(default = "default_status_endpoint")]
    pub status_endpoint: String,

    /// Prefix of snapshot URLs built from a capture timestamp.
    #[serde(default = "default_snapshot_base")]
    pub snapshot_base: String,

    /// Extra hosts whose links count as archive references.
    #[serde(default)]
    pub archive_hosts: Vec<String>,

    /// Hosts never submitted for capture.
    #[serde(default = "default_host_denylist")]
    pub host_denylist: Vec<String>,

    /// Env var holding the Save Page Now access key.
    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,

    /// Env var holding the Save Page Now secret key.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// First wait between status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for the growing poll interval, in milliseconds.
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Submissions attempted while the service reports a session limit.
    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,

    /// Wait between submissions after a session limit, in milliseconds.
    #[serde(default = "default_session_retry_ms")]
    pub session_retry_ms: u64,

    /// Minimum cool-down after a 429 from the archive service, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            availability_endpoint: default_availability_endpoint(),
            save_endpoint: default_save_endpoint(),
            status_endpoint: default_status_endpoint(),
            snapshot_base: default_snapshot_base(),
            archive_hosts: Vec::new(),
            host_denylist: default_host_denylist(),
            access_key_env: default_access_key_env(),
            secret_key_env: default_secret_key_env(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            max_submit_attempts: default_max_submit_attempts(),
            session_retry_ms: default_session_retry_ms(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl ArchiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// `LOW access:secret` header value, if both env vars are set.
    pub fn authorization(&self) -> Option<String> {
        let access = std::env::var(&self.access_key_env).ok()?;
        let secret = std::env::var(&self.secret_key_env).ok()?;
        if access.is_empty() || secret.is_empty() {
            return None;
        }
        Some(format!("LOW {access}:{secret}"))
    }
}

fn default_availability_endpoint() -> String {
    "https://archive.org/wayback/available".into()
}
fn default_save_endpoint() -> String {
    "https://web.archive.org/save".into()
}
fn default_status_endpoint() -> String {
    "https://web.archive.org/save/status".into()
}
fn default_snapshot_base() -> String {
    "https://web.archive.org/web".into()
}
fn default_host_denylist() -> Vec<String> {
    vec![
        "www.fastcompany.com".into(),
        "www.techpowerup.com".into(),
        "discord.com".into(),
    ]
}
fn default_access_key_env() -> String {
    "ARCHIVE_ACCESS_KEY".into()
}
fn default_secret_key_env() -> String {
    "ARCHIVE_SECRET_KEY".into()
}
fn default_poll_interval_ms() -> u64 {
    5_000
}
fn default_max_poll_interval_ms() -> u64 {
    30_000
}
fn default_max_poll_attempts() -> u32 {
    12
}
fn default_max_submit_attempts() -> u32 {
    3
}
fn default_session_retry_ms() -> u64 {
    5_000
}
fn default_cooldown_secs() -> u64 {
    600
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load config from an explicit path, or from `link-archivist.toml` in the
/// working directory when it exists, or fall back to defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => load_from(path)?,
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                load_from(path)?
            } else {
                tracing::debug!("no config file found, using defaults");
                Config::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load config from a specific file path.
pub fn load_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ArchivistError::io(path, e))?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        ArchivistError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

impl Config {
    /// Reject values that would deadlock or spin.
    pub fn validate(&self) -> Result<()> {
        if self.run.concurrency == 0 {
            return Err(ArchivistError::config("run.concurrency must be at least 1"));
        }
        if self.run.document_concurrency == 0 {
            return Err(ArchivistError::config(
                "run.document_concurrency must be at least 1",
            ));
        }
        if self.archive.max_poll_attempts == 0 || self.archive.max_submit_attempts == 0 {
            return Err(ArchivistError::config(
                "archive poll and submit attempts must be at least 1",
            ));
        }
        for endpoint in [
            &self.archive.availability_endpoint,
            &self.archive.save_endpoint,
            &self.archive.status_endpoint,
            &self.archive.snapshot_base,
        ] {
            url::Url::parse(endpoint).map_err(|e| {
                ArchivistError::config(format!("invalid archive endpoint '{endpoint}': {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.run.concurrency, 8);
        assert_eq!(config.liveness.timeout(), Duration::from_secs(10));
        assert_eq!(config.liveness.max_redirects, 5);
        assert!(config
            .archive
            .host_denylist
            .contains(&"discord.com".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml_str = r#"
[run]
concurrency = 16

[archive]
archive_hosts = ["archive.example"]
cooldown_secs = 30
"#;
        let config: Config = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.run.concurrency, 16);
        assert_eq!(config.run.document_concurrency, 4);
        assert_eq!(config.archive.archive_hosts, vec!["archive.example"]);
        assert_eq!(config.archive.cooldown(), Duration::from_secs(30));
        assert_eq!(config.archive.max_poll_attempts, 12);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.run.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("run.concurrency"));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let mut config = Config::default();
        config.archive.save_endpoint = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[liveness]\ntimeout_secs = 3\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.liveness.timeout_secs, 3);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[run\nconcurrency = ").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ArchivistError::Config { .. }));
    }

    #[test]
    fn test_authorization_requires_both_keys() {
        let mut config = ArchiveConfig::default();
        config.access_key_env = "LINK_ARCHIVIST_TEST_ACCESS_UNSET".into();
        config.secret_key_env = "LINK_ARCHIVIST_TEST_SECRET_UNSET".into();
        assert_eq!(config.authorization(), None);
    }
}
