//! HTTP source fetching shared by the runtime registry, the library loader
//! and the session/manifest readers

use crate::error::FetchError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Build the HTTP client used for every outbound request
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)
}

/// GET `url` and return the body; non-2xx statuses and empty bodies are errors
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    debug!(url, "fetching");
    let response = client.get(url).send().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(FetchError::Empty { url: url.to_string() });
    }
    debug!(url, len = bytes.len(), "fetched");
    Ok(bytes.to_vec())
}

/// GET `url` and decode the body as JSON
pub async fn fetch_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T, FetchError> {
    let bytes = fetch_bytes(client, url).await?;
    serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
