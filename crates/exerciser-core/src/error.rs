//! Error types shared across the exerciser crates

use thiserror::Error;

pub const STACK_OVERFLOW_MESSAGE: &str =
    "Stack overflow error: Check for non-terminating recursive function. Consider rewriting as tail-recursive.";

pub const TIMEOUT_MESSAGE: &str = "Expression evaluation timeout: Check for infinite loop";

/// Raised by the resource governor from inside an evaluation hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GovernorError {
    /// Evaluation nesting went past the configured depth
    #[error("{}", STACK_OVERFLOW_MESSAGE)]
    StackOverflow { depth: u32, max_depth: u32 },

    /// Evaluation ran past its wall-clock budget
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },
}

/// Failure reported by an in-process runtime
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalFailure {
    /// The governor aborted the evaluation
    #[error(transparent)]
    Governor(#[from] GovernorError),

    /// The expression itself failed (syntax or evaluation error)
    #[error("{message}")]
    Expression {
        message: String,
        position: Option<usize>,
        code: Option<String>,
    },

    /// The host stack guard tripped before the governor did
    #[error("Stack overflow error: evaluation exhausted the runtime stack")]
    StackExhausted,

    /// The runtime misbehaved (ABI violation, trap, missing export)
    #[error("runtime fault: {0}")]
    Runtime(String),
}

impl EvalFailure {
    /// Shorthand for an expression error without position or code
    pub fn expression(message: impl Into<String>) -> Self {
        EvalFailure::Expression {
            message: message.into(),
            position: None,
            code: None,
        }
    }
}

/// Errors while calling a callable binding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingCallError {
    #[error("unknown binding '{0}'")]
    UnknownBinding(String),

    #[error("module '{module}' has no export '{symbol}'")]
    UnknownSymbol { module: String, symbol: String },

    #[error("'{name}' expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("argument {index} to '{name}' is not a number")]
    NonNumericArgument { name: String, index: usize },

    #[error("'{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Errors while fetching a remote source over HTTP
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16, body: String },

    #[error("{url} returned an empty body")]
    Empty { url: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
