//! Evaluation requests

use crate::binding::{Binding, Bindings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Which evaluator handles a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// The runtime installed in this process, under the governor
    #[default]
    InProcess,
    /// The remote HTTP evaluator
    Remote,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in-process" | "inprocess" | "local" => Ok(Backend::InProcess),
            "remote" => Ok(Backend::Remote),
            _ => Err(format!("Unknown backend: {}. Expected: in-process or remote", s)),
        }
    }
}

/// Resource limits enforced on an in-process evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorLimits {
    pub max_depth: u32,
    pub timeout_ms: u64,
}

impl Default for GovernorLimits {
    fn default() -> Self {
        Self {
            max_depth: 500,
            timeout_ms: 1000,
        }
    }
}

impl GovernorLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One evaluation attempt
///
/// Built fresh for every attempt and never mutated once dispatched.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    /// The parsed input document; `None` when the document is empty
    pub input: Option<Value>,
    pub expression: String,
    pub bindings: Bindings,
    pub backend: Backend,
    /// Overrides the dispatcher's default limits
    pub limits: Option<GovernorLimits>,
}

impl EvaluationRequest {
    pub fn new(expression: impl Into<String>, input: Option<Value>) -> Self {
        Self {
            input,
            expression: expression.into(),
            bindings: Bindings::new(),
            backend: Backend::default(),
            limits: None,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_binding(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    pub fn with_limits(mut self, limits: GovernorLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}
