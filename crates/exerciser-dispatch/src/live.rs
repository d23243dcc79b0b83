//! Debounced re-evaluation while the texts are being edited
//!
//! Every submission is stamped with a fresh `EvaluationTicket` and replaces
//! the pending one. Outcomes arrive on a channel together with their ticket;
//! anything whose ticket is no longer current is stale and should be dropped.
//!
//! A runtime version change installs the new origin in the background and
//! re-evaluates after a shorter delay; the evaluation waits for the new
//! runtime to become ready.

use crate::debounce::Debouncer;
use crate::dispatcher::Dispatcher;
use exerciser_core::{
    EvaluationOutcome, EvaluationRequest, InputError, Origin, RuntimeHandle, Timing,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EvaluationTicket(u64);

impl EvaluationTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// An outcome and the submission it answers
#[derive(Debug, Clone, PartialEq)]
pub struct TicketedOutcome {
    pub ticket: EvaluationTicket,
    pub outcome: EvaluationOutcome,
}

pub struct LiveEvaluator {
    dispatcher: Arc<Dispatcher>,
    debouncer: Debouncer,
    version_change_delay: Duration,
    latest: Arc<AtomicU64>,
    outcomes: mpsc::UnboundedSender<TicketedOutcome>,
}

impl LiveEvaluator {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TicketedOutcome>) {
        let (outcomes, receiver) = mpsc::unbounded_channel();
        let evaluator = Self {
            dispatcher,
            debouncer: Debouncer::new(delay),
            version_change_delay: Timing::default().version_change_delay(),
            latest: Arc::new(AtomicU64::new(0)),
            outcomes,
        };
        (evaluator, receiver)
    }

    /// An evaluator using the configured edit and version-change delays
    pub fn with_timing(
        dispatcher: Arc<Dispatcher>,
        timing: &Timing,
    ) -> (Self, mpsc::UnboundedReceiver<TicketedOutcome>) {
        let (mut evaluator, receiver) = Self::new(dispatcher, timing.debounce());
        evaluator.version_change_delay = timing.version_change_delay();
        (evaluator, receiver)
    }

    /// Evaluate after the quiet period, superseding any pending evaluation
    ///
    /// A request that could not be built (bad input document or bindings) is
    /// reported as an `InputError` outcome on the same schedule.
    pub fn submit(&mut self, request: Result<EvaluationRequest, InputError>) -> EvaluationTicket {
        let delay = self.debouncer.delay();
        self.submit_after(delay, request)
    }

    pub fn submit_after(
        &mut self,
        delay: Duration,
        request: Result<EvaluationRequest, InputError>,
    ) -> EvaluationTicket {
        let ticket = EvaluationTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        let dispatcher = Arc::clone(&self.dispatcher);
        let latest = Arc::clone(&self.latest);
        let outcomes = self.outcomes.clone();

        self.debouncer.schedule_after(delay, async move {
            let outcome = match request {
                Ok(request) => dispatcher.evaluate(&request).await,
                Err(err) => EvaluationOutcome::InputError(err),
            };
            if latest.load(Ordering::SeqCst) != ticket.0 {
                debug!(ticket = ticket.0, "discarding stale outcome");
                return;
            }
            let _ = outcomes.send(TicketedOutcome { ticket, outcome });
        });
        ticket
    }

    /// Switch the runtime to `origin` and re-evaluate `request` against it
    ///
    /// Outcomes of evaluations started before the switch become stale.
    pub fn change_version(
        &mut self,
        origin: Origin,
        request: Result<EvaluationRequest, InputError>,
    ) -> (RuntimeHandle, EvaluationTicket) {
        info!(%origin, "changing runtime version");
        let handle = self.dispatcher.registry().install_runtime(origin);
        let ticket = self.submit_after(self.version_change_delay, request);
        (handle, ticket)
    }

    pub fn is_current(&self, ticket: EvaluationTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Drop the pending evaluation; its ticket becomes stale
    pub fn cancel(&mut self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.debouncer.cancel();
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
