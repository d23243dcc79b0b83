//! Exerciser configuration
//!
//! Loaded from a TOML file; every field has a default so a partial file (or
//! no file at all) is valid.
//!
//! ```toml
//! [endpoints]
//! remote_eval_url = "http://localhost:8080/parseJsonata"
//! release_url = "https://cdn.example.com/runtime@{version}/runtime.wasm"
//!
//! [governor]
//! max_depth = 500
//! timeout_ms = 1000
//!
//! [timing]
//! debounce_ms = 500
//! ```

use crate::origin::Origin;
use crate::request::GovernorLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const SERVICE_BASE: &str =
    "https://us-south.functions.appdomain.cloud/api/v1/web/04d6b400-5947-46c6-ae3e-ebdf4a7056de/default/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciserConfig {
    pub endpoints: Endpoints,
    pub governor: GovernorLimits,
    pub timing: Timing,
}

impl ExerciserConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Remote collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Remote evaluator (`POST`, multipart `json` + `rule`)
    pub remote_eval_url: String,
    /// Ordered list of published runtime versions
    pub manifest_url: String,
    /// Shared-session descriptors, queried with `?id=`
    pub shared_session_url: String,
    /// Development build of the runtime
    pub local_runtime_url: String,
    /// Published runtime; `{version}` is replaced by the tag
    pub release_url: String,
    /// Branch build of the runtime; `{branch}` is replaced by the branch name
    pub branch_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            remote_eval_url: "https://jsonata.appleby-analytics.com/parseJsonata".into(),
            manifest_url: format!("{}jsonata-versions.json", SERVICE_BASE),
            shared_session_url: format!("{}get-shared.json", SERVICE_BASE),
            local_runtime_url: "http://localhost:3009/runtime.wasm".into(),
            release_url: "https://cdn.jsdelivr.net/npm/jsonata-runtime@{version}/runtime.wasm".into(),
            branch_url: "https://rawgit.com/jsonata-js/jsonata-runtime/{branch}/runtime.wasm".into(),
        }
    }
}

impl Endpoints {
    /// Resolve the distribution URL for a runtime origin
    pub fn runtime_url(&self, origin: &Origin) -> String {
        match origin {
            Origin::Local => self.local_runtime_url.clone(),
            Origin::TaggedRelease(tag) => self.release_url.replace("{version}", tag),
            Origin::Branch(branch) => self.branch_url.replace("{branch}", branch),
        }
    }

    /// Descriptor URL for a shared session, with `id` query-encoded
    ///
    /// An unparseable base URL is returned unchanged so the fetch reports it.
    pub fn shared_session(&self, id: &str) -> String {
        reqwest::Url::parse_with_params(&self.shared_session_url, &[("id", id)])
            .map(String::from)
            .unwrap_or_else(|_| self.shared_session_url.clone())
    }
}

/// Scheduling intervals, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Quiet period after an edit before re-evaluating
    pub debounce_ms: u64,
    /// Poll interval while the runtime is still loading
    pub readiness_poll_ms: u64,
    /// Delay before re-evaluating after a runtime version change
    pub version_change_delay_ms: u64,
    pub http_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            readiness_poll_ms: 500,
            version_change_delay_ms: 100,
            http_timeout_ms: 30_000,
        }
    }
}

impl Timing {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn version_change_delay(&self) -> Duration {
        Duration::from_millis(self.version_change_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
