use crate::pretty::pretty_print;
use exerciser_core::{EvaluationOutcome, OutcomeKind, STACK_OVERFLOW_MESSAGE, TIMEOUT_MESSAGE};
use serde::Serialize;
use tracing::trace;

pub const NO_MATCH: &str = "** no match **";
pub const AWAITING_EXPRESSION: &str = "^^ Enter an expression to evaluate ^^";

/// What the result pane shows for one outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayText {
    pub text: String,
    pub kind: OutcomeKind,
    /// Character offset into the input document, for input errors
    pub error_offset: Option<usize>,
}

/// Render an outcome; total and deterministic
pub fn serialize(outcome: &EvaluationOutcome) -> DisplayText {
    let text = match outcome {
        EvaluationOutcome::AwaitingExpression => AWAITING_EXPRESSION.to_string(),
        EvaluationOutcome::Success(value) => pretty_print(value).unwrap_or_else(|| NO_MATCH.to_string()),
        EvaluationOutcome::NoMatch => NO_MATCH.to_string(),
        EvaluationOutcome::InputError(err) => format!("ERROR IN INPUT DATA: {}", err.message),
        EvaluationOutcome::EvaluationError(message) => format!("** evaluation error ** {}", message),
        EvaluationOutcome::TimeoutError => format!("** timeout ** {}", TIMEOUT_MESSAGE),
        EvaluationOutcome::StackOverflowError => format!("** stack overflow ** {}", STACK_OVERFLOW_MESSAGE),
        EvaluationOutcome::BackendError(raw) => format!("** backend error ** {}", raw),
    };
    let error_offset = match outcome {
        EvaluationOutcome::InputError(err) => err.offset,
        _ => None,
    };
    trace!(kind = ?outcome.kind(), len = text.len(), "serialized outcome");
    DisplayText {
        text,
        kind: outcome.kind(),
        error_offset,
    }
}
