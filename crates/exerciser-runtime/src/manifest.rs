//! Published runtime versions

use exerciser_core::{fetch_json, FetchError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Body of the version manifest endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    /// Newest first
    pub versions: Vec<String>,
}

/// Fetch the ordered list of version tags
///
/// With `include_local` the development build is offered first, so it also
/// becomes the default selection.
pub async fn fetch_versions(
    client: &reqwest::Client,
    manifest_url: &str,
    include_local: bool,
) -> Result<Vec<String>, FetchError> {
    let manifest: VersionManifest = fetch_json(client, manifest_url).await?;
    let mut versions = manifest.versions;
    if include_local {
        versions.insert(0, "local".to_string());
    }
    info!(count = versions.len(), "fetched runtime versions");
    Ok(versions)
}
