//! Exerciser sessions
//!
//! A `Session` holds the editable texts (input document, expression and
//! bindings) plus the libraries to load. Sessions can be seeded from a shared
//! descriptor fetched by id.

use crate::input::{parse_bindings, parse_input, DEFAULT_BINDINGS_TEXT};
use exerciser_core::{fetch_json, Backend, Bindings, Endpoints, EvaluationRequest, FetchError, InputError};
use exerciser_libraries::ExternalLibrarySpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session id must not be empty")]
    EmptyId,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A shared session as published by the sharing service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default)]
    pub jsonata: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<String>,
    #[serde(default, rename = "externalLibs")]
    pub external_libs: Vec<ExternalLibrarySpec>,
}

/// Fetch a shared session descriptor by id
pub async fn fetch_shared_session(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    id: &str,
) -> Result<SharedSession, SessionError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(SessionError::EmptyId);
    }
    let session: SharedSession = fetch_json(client, &endpoints.shared_session(id)).await?;
    info!(id, libraries = session.external_libs.len(), "loaded shared session");
    Ok(session)
}

/// The editable state of one exerciser session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub document: String,
    pub expression: String,
    pub bindings: String,
    pub libraries: Vec<ExternalLibrarySpec>,
    pub backend: Backend,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            document: "{}".to_string(),
            expression: String::new(),
            bindings: String::new(),
            libraries: Vec::new(),
            backend: Backend::default(),
        }
    }
}

impl Session {
    /// Seed a session from a shared descriptor
    ///
    /// The document is pretty-printed; missing bindings get the commented
    /// placeholder object.
    pub fn from_shared(shared: SharedSession) -> Self {
        let document = shared
            .json
            .as_ref()
            .and_then(|json| serde_json::to_string_pretty(json).ok())
            .unwrap_or_default();
        Self {
            document,
            expression: shared.jsonata,
            bindings: shared.bindings.unwrap_or_else(|| DEFAULT_BINDINGS_TEXT.to_string()),
            libraries: shared.external_libs,
            backend: Backend::default(),
        }
    }

    /// Build the request for the current texts
    ///
    /// `library_bindings` are layered over the bindings text, so a loaded
    /// library wins over a value binding of the same name.
    pub fn request(&self, library_bindings: &Bindings) -> Result<EvaluationRequest, InputError> {
        let input = parse_input(&self.document)?;
        let mut bindings = parse_bindings(&self.bindings)?;
        bindings.extend(library_bindings.iter().map(|(name, binding)| (name.clone(), binding.clone())));
        Ok(EvaluationRequest::new(self.expression.clone(), input)
            .with_bindings(bindings)
            .with_backend(self.backend))
    }
}
