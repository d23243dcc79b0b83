//! The evaluation surface shared by every expression runtime

use exerciser_core::{Bindings, EvalFailure, GovernorError, ResultValue};
use serde_json::Value;

/// Callbacks a runtime invokes around each reducible sub-expression
///
/// An error returned from either hook must abort the evaluation and be
/// reported back as `EvalFailure::Governor`.
pub trait EvaluationHooks: Send {
    /// Called immediately before evaluating a sub-expression
    fn enter(&mut self) -> Result<(), GovernorError>;

    /// Called immediately after a sub-expression produced its value
    fn exit(&mut self) -> Result<(), GovernorError>;
}

/// What a runtime supports beyond plain evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeCapabilities {
    /// The runtime calls `EvaluationHooks` around its reduction steps
    pub hooks: bool,
    /// The runtime can call callable bindings
    pub bindings: bool,
}

/// Arguments of one evaluation
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub expression: &'a str,
    pub input: Option<&'a Value>,
    pub bindings: &'a Bindings,
}

/// An installed expression-language runtime
pub trait ExpressionRuntime: Send + Sync {
    fn capabilities(&self) -> RuntimeCapabilities;

    /// Evaluate an expression; `Ok(None)` means the expression matched nothing
    fn evaluate(
        &self,
        evaluation: &Evaluation<'_>,
        hooks: Option<Box<dyn EvaluationHooks>>,
    ) -> Result<Option<ResultValue>, EvalFailure>;
}
