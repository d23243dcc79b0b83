//! Remote evaluation over HTTP
//!
//! The remote evaluator takes a multipart form with the serialized input
//! document in `json` and the expression in `rule`. It answers with the
//! result as JSON text. HTTP 204 or an empty body means the expression
//! matched nothing; a `null` body is the value `null`.

use exerciser_core::ResultValue;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote evaluator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{body}")]
    Malformed { body: String },
}

impl RemoteError {
    /// The raw diagnostic text shown to the user
    pub fn raw_text(&self) -> String {
        match self {
            RemoteError::Status { status, body } if body.trim().is_empty() => format!("HTTP {}", status),
            RemoteError::Status { body, .. } | RemoteError::Malformed { body } => body.clone(),
            RemoteError::Transport { .. } => self.to_string(),
        }
    }
}

/// Client for the remote evaluation endpoint
#[derive(Debug, Clone)]
pub struct RemoteEvaluator {
    client: reqwest::Client,
    url: String,
}

impl RemoteEvaluator {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one evaluation; `Ok(None)` means no match
    pub async fn evaluate(&self, input: Option<&Value>, expression: &str) -> Result<Option<ResultValue>, RemoteError> {
        let json = input.map(Value::to_string).unwrap_or_default();
        let form = reqwest::multipart::Form::new()
            .text("json", json)
            .text("rule", expression.to_string());

        debug!(url = %self.url, "posting remote evaluation");
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| RemoteError::Transport {
            url: self.url.clone(),
            source,
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "remote evaluator rejected request");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&body).map_err(|_| RemoteError::Malformed { body })?;
        Ok(Some(ResultValue::from(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text() {
        let status = RemoteError::Status {
            status: 500,
            body: "java.lang.NullPointerException".into(),
        };
        assert_eq!(status.raw_text(), "java.lang.NullPointerException");

        let bare = RemoteError::Status {
            status: 502,
            body: String::new(),
        };
        assert_eq!(bare.raw_text(), "HTTP 502");

        let malformed = RemoteError::Malformed {
            body: "<html>oops</html>".into(),
        };
        assert_eq!(malformed.raw_text(), "<html>oops</html>");
    }
}
