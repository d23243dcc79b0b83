//! exerciser-dispatch: Getting from edited texts to evaluation outcomes
//!
//! This crate provides:
//! - `Dispatcher`: routes a request to the governed in-process runtime or
//!   the remote evaluator and normalizes the result
//! - `RemoteEvaluator`: the multipart HTTP client for remote evaluation
//! - `parse_input` / `parse_bindings` / `format_document`: the editable
//!   texts, with character offsets for malformed input
//! - `Session` / `SharedSession`: editable state and the shared descriptor
//! - `Debouncer` / `LiveEvaluator`: cancellable, ticketed re-evaluation

mod debounce;
mod dispatcher;
mod input;
mod live;
mod remote;
mod session;

pub use debounce::Debouncer;
pub use dispatcher::{run_governed, Dispatcher, TRACE_BINDING};
pub use input::{format_document, parse_bindings, parse_input, DEFAULT_BINDINGS_TEXT};
pub use live::{EvaluationTicket, LiveEvaluator, TicketedOutcome};
pub use remote::{RemoteError, RemoteEvaluator};
pub use session::{fetch_shared_session, Session, SessionError, SharedSession};
