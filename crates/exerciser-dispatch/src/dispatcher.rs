//! Backend Dispatcher
//!
//! Routes an `EvaluationRequest` to the in-process runtime or the remote
//! evaluator and normalizes whatever happens into an `EvaluationOutcome`.
//! Nothing escapes `evaluate`: runtime failures, governor trips, transport
//! errors and panics all become outcome variants.

use crate::remote::RemoteEvaluator;
use exerciser_core::{
    Backend, Binding, EvalFailure, EvaluationOutcome, EvaluationRequest, ExerciserConfig, GovernorLimits,
    NativeFunction,
};
use exerciser_runtime::{Evaluation, Governor, LiveRuntime, RuntimeRegistry};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the logging binding added to in-process evaluations
pub const TRACE_BINDING: &str = "trace";

pub struct Dispatcher {
    registry: Arc<RuntimeRegistry>,
    remote: RemoteEvaluator,
    limits: GovernorLimits,
    readiness_poll: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<RuntimeRegistry>, remote: RemoteEvaluator) -> Self {
        Self {
            registry,
            remote,
            limits: GovernorLimits::default(),
            readiness_poll: Duration::from_millis(500),
        }
    }

    pub fn from_config(registry: Arc<RuntimeRegistry>, client: reqwest::Client, config: &ExerciserConfig) -> Self {
        Self::new(registry, RemoteEvaluator::new(client, config.endpoints.remote_eval_url.clone()))
            .with_limits(config.governor)
            .with_readiness_poll(config.timing.readiness_poll())
    }

    /// Default limits for requests that carry none
    pub fn with_limits(mut self, limits: GovernorLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_readiness_poll(mut self, poll: Duration) -> Self {
        self.readiness_poll = poll;
        self
    }

    pub fn registry(&self) -> &Arc<RuntimeRegistry> {
        &self.registry
    }

    /// Evaluate one request
    ///
    /// In-process requests wait for the registry to have a live runtime.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> EvaluationOutcome {
        if request.expression.trim().is_empty() {
            return EvaluationOutcome::AwaitingExpression;
        }

        let outcome = match request.backend {
            Backend::InProcess => self.evaluate_in_process(request).await,
            Backend::Remote => self.evaluate_remote(request).await,
        };
        info!(backend = ?request.backend, outcome = ?outcome.kind(), "evaluation finished");
        outcome
    }

    async fn evaluate_in_process(&self, request: &EvaluationRequest) -> EvaluationOutcome {
        let live = self.registry.wait_ready(self.readiness_poll).await;
        let limits = request.limits.unwrap_or(self.limits);
        let request = request.clone();

        // Evaluation is synchronous and may run up to the governor timeout
        match tokio::task::spawn_blocking(move || run_governed(&live, &request, limits)).await {
            Ok(outcome) => outcome,
            Err(err) => EvaluationOutcome::BackendError(format!("evaluation task failed: {}", err)),
        }
    }

    async fn evaluate_remote(&self, request: &EvaluationRequest) -> EvaluationOutcome {
        match self.remote.evaluate(request.input.as_ref(), &request.expression).await {
            Ok(value) => EvaluationOutcome::from_result(value),
            Err(err) => {
                warn!(url = %self.remote.url(), error = %err, "remote evaluation failed");
                EvaluationOutcome::BackendError(err.raw_text())
            }
        }
    }
}

/// Run `request` on `live` under the governor, on the current thread
pub fn run_governed(live: &LiveRuntime, request: &EvaluationRequest, limits: GovernorLimits) -> EvaluationOutcome {
    let mut bindings = request.bindings.clone();
    bindings
        .entry(TRACE_BINDING.to_string())
        .or_insert_with(|| Binding::Native(trace_function()));

    let evaluation = Evaluation {
        expression: &request.expression,
        input: request.input.as_ref(),
        bindings: &bindings,
    };
    let governed = Governor::wrap(live.runtime.as_ref(), &live.origin, limits);
    debug!(origin = %live.origin, governed = governed.is_governed(), "evaluating in process");

    match panic::catch_unwind(AssertUnwindSafe(|| governed.evaluate(&evaluation))) {
        Ok(Ok(value)) => EvaluationOutcome::from_result(value),
        Ok(Err(failure)) => failure_outcome(failure),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(origin = %live.origin, %message, "runtime panicked");
            EvaluationOutcome::BackendError(format!("runtime panicked: {}", message))
        }
    }
}

fn failure_outcome(failure: EvalFailure) -> EvaluationOutcome {
    match failure {
        EvalFailure::Governor(err) => EvaluationOutcome::from(err),
        EvalFailure::StackExhausted => EvaluationOutcome::StackOverflowError,
        EvalFailure::Expression { message, .. } => EvaluationOutcome::EvaluationError(message),
        EvalFailure::Runtime(message) => EvaluationOutcome::BackendError(message),
    }
}

fn trace_function() -> NativeFunction {
    NativeFunction::new(TRACE_BINDING, 1, |args| {
        let arg = args.first().cloned().unwrap_or(Value::Null);
        info!(target: "exerciser::trace", "{}", arg);
        Ok(Value::Null)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
