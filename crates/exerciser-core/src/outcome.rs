//! Normalized evaluation outcomes

use crate::error::GovernorError;
use crate::value::ResultValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The input document is not valid structured data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InputError {
    pub message: String,
    /// Zero-based character offset of the offending token
    pub offset: Option<usize>,
}

/// Outcome of one evaluation attempt, whichever backend ran it
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// The expression is empty; nothing was evaluated
    AwaitingExpression,
    Success(ResultValue),
    /// The expression matched nothing
    NoMatch,
    InputError(InputError),
    EvaluationError(String),
    TimeoutError,
    StackOverflowError,
    /// Transport or protocol failure; carries the raw diagnostic text
    BackendError(String),
}

/// Discriminant of an outcome, for display and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    AwaitingExpression,
    Success,
    NoMatch,
    InputError,
    EvaluationError,
    TimeoutError,
    StackOverflowError,
    BackendError,
}

impl EvaluationOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            EvaluationOutcome::AwaitingExpression => OutcomeKind::AwaitingExpression,
            EvaluationOutcome::Success(_) => OutcomeKind::Success,
            EvaluationOutcome::NoMatch => OutcomeKind::NoMatch,
            EvaluationOutcome::InputError(_) => OutcomeKind::InputError,
            EvaluationOutcome::EvaluationError(_) => OutcomeKind::EvaluationError,
            EvaluationOutcome::TimeoutError => OutcomeKind::TimeoutError,
            EvaluationOutcome::StackOverflowError => OutcomeKind::StackOverflowError,
            EvaluationOutcome::BackendError(_) => OutcomeKind::BackendError,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            EvaluationOutcome::AwaitingExpression | EvaluationOutcome::Success(_) | EvaluationOutcome::NoMatch
        )
    }

    /// Normalize a result that may be absent: absence is `NoMatch`
    pub fn from_result(value: Option<ResultValue>) -> Self {
        match value {
            None | Some(ResultValue::Undefined) => EvaluationOutcome::NoMatch,
            Some(value) => EvaluationOutcome::Success(value),
        }
    }
}

impl From<GovernorError> for EvaluationOutcome {
    fn from(err: GovernorError) -> Self {
        match err {
            GovernorError::StackOverflow { .. } => EvaluationOutcome::StackOverflowError,
            GovernorError::Timeout { .. } => EvaluationOutcome::TimeoutError,
        }
    }
}

impl From<InputError> for EvaluationOutcome {
    fn from(err: InputError) -> Self {
        EvaluationOutcome::InputError(err)
    }
}
