//! Resource Governor - cooperative depth and deadline enforcement
//!
//! The governor is a pair of evaluation hooks. Every `enter` increments the
//! call depth and every `exit` decrements it; both re-check the depth limit
//! and the deadline, so an evaluation that keeps reducing is aborted promptly
//! once it overruns either limit.
//!
//! # Limitations
//!
//! Enforcement is cooperative. A runtime that loops without re-entering its
//! instrumented evaluation step never calls the hooks and cannot be stopped
//! here. Runtimes that expose no hooks at all run ungoverned, with a warning.
//! Local development builds are trusted and always run ungoverned.

use crate::runtime::{Evaluation, EvaluationHooks, ExpressionRuntime};
use exerciser_core::{EvalFailure, GovernorError, GovernorLimits, Origin, ResultValue};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-evaluation counters; never shared between evaluations
#[derive(Debug, Clone, Copy)]
pub struct GovernorState {
    pub call_depth: u32,
    pub started: Instant,
    pub limits: GovernorLimits,
}

impl GovernorState {
    pub fn new(limits: GovernorLimits) -> Self {
        Self::started_at(limits, Instant::now())
    }

    pub fn started_at(limits: GovernorLimits, started: Instant) -> Self {
        Self {
            call_depth: 0,
            started,
            limits,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn check(&self) -> Result<(), GovernorError> {
        if self.call_depth > self.limits.max_depth {
            return Err(GovernorError::StackOverflow {
                depth: self.call_depth,
                max_depth: self.limits.max_depth,
            });
        }
        let elapsed = self.elapsed();
        if elapsed > self.limits.timeout() {
            return Err(GovernorError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                timeout_ms: self.limits.timeout_ms,
            });
        }
        Ok(())
    }
}

/// Evaluation hooks enforcing `GovernorLimits`
#[derive(Debug)]
pub struct Governor {
    state: GovernorState,
}

impl Governor {
    /// A governor whose clock starts now
    pub fn new(limits: GovernorLimits) -> Self {
        Self {
            state: GovernorState::new(limits),
        }
    }

    pub fn from_state(state: GovernorState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GovernorState {
        &self.state
    }

    /// Instrument `runtime` for one origin
    ///
    /// Local development builds bypass the governor entirely.
    pub fn wrap<'a>(
        runtime: &'a dyn ExpressionRuntime,
        origin: &Origin,
        limits: GovernorLimits,
    ) -> GovernedRuntime<'a> {
        GovernedRuntime {
            runtime,
            limits,
            bypass: origin.is_local(),
        }
    }
}

impl EvaluationHooks for Governor {
    fn enter(&mut self) -> Result<(), GovernorError> {
        self.state.call_depth += 1;
        self.state.check()
    }

    fn exit(&mut self) -> Result<(), GovernorError> {
        match self.state.call_depth.checked_sub(1) {
            Some(depth) => self.state.call_depth = depth,
            None => warn!("evaluation exit hook called without a matching entry"),
        }
        self.state.check()
    }
}

/// A runtime whose evaluations run under a fresh governor each time
pub struct GovernedRuntime<'a> {
    runtime: &'a dyn ExpressionRuntime,
    limits: GovernorLimits,
    bypass: bool,
}

impl GovernedRuntime<'_> {
    /// Whether evaluations will actually be timeboxed
    pub fn is_governed(&self) -> bool {
        !self.bypass && self.runtime.capabilities().hooks
    }

    pub fn evaluate(&self, evaluation: &Evaluation<'_>) -> Result<Option<ResultValue>, EvalFailure> {
        let hooks: Option<Box<dyn EvaluationHooks>> = if self.bypass {
            debug!("local runtime; governor bypassed");
            None
        } else if !self.runtime.capabilities().hooks {
            warn!("runtime exposes no evaluation hooks; timeboxing disabled");
            None
        } else {
            Some(Box::new(Governor::new(self.limits)))
        };
        self.runtime.evaluate(evaluation, hooks)
    }
}
