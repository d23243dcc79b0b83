//! exerciser-core: Shared data model for the expression exerciser
//!
//! This crate holds the types every other exerciser crate agrees on:
//! - `Origin` / `RuntimeHandle`: which expression runtime is installed
//! - `EvaluationRequest` / `Backend`: one evaluation attempt
//! - `Binding` / `Bindings`: names visible to the evaluated expression
//! - `ResultValue` / `EvaluationOutcome`: what an evaluation produced
//! - `ExerciserConfig`: endpoints, governor limits and timings
//!
//! # Flow
//!
//! ```text
//! edit ──debounce──▶ EvaluationRequest ──▶ Dispatcher ──▶ EvaluationOutcome ──▶ Serializer
//!                                            │      │
//!                                  in-process│      │remote
//!                                   (governed)      (HTTP)
//! ```

mod binding;
mod config;
mod error;
mod fetch;
mod origin;
mod outcome;
mod request;
mod value;

pub use binding::{
    invoke_binding, resolve_binding_refs, value_bindings, Binding, Bindings, ModuleBinding, NativeFunction, BINDING_REF,
};
pub use config::{ConfigError, Endpoints, ExerciserConfig, Timing};
pub use error::{BindingCallError, EvalFailure, FetchError, GovernorError, STACK_OVERFLOW_MESSAGE, TIMEOUT_MESSAGE};
pub use fetch::{fetch_bytes, fetch_json, http_client};
pub use origin::{Origin, RuntimeHandle};
pub use outcome::{EvaluationOutcome, InputError, OutcomeKind};
pub use request::{Backend, EvaluationRequest, GovernorLimits};
pub use value::{ResultValue, NATIVE_MARKER};
