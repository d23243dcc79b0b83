//! exerciser-runtime: Expression runtimes and how they are governed
//!
//! This crate provides:
//! - `ExpressionRuntime`: the evaluation surface every runtime implements
//! - `RuntimeRegistry`: the single live runtime, swapped atomically on install
//! - `Governor`: cooperative recursion-depth and wall-clock limits
//! - `WasmRuntime`: a runtime compiled from a fetched WebAssembly module
//! - `fetch_versions`: the published-version manifest
//!
//! The runtime's expression grammar is opaque to this crate. A runtime only
//! has to report absence (`None`), a value, or a failure, and call the
//! evaluation hooks around each reduction step if it wants to be governed.

mod error;
mod governor;
mod manifest;
mod registry;
mod runtime;
mod wasm;

pub use error::RuntimeLoadError;
pub use governor::{GovernedRuntime, Governor, GovernorState};
pub use manifest::{fetch_versions, VersionManifest};
pub use registry::{LiveRuntime, RuntimeLoader, RuntimeRegistry};
pub use runtime::{Evaluation, EvaluationHooks, ExpressionRuntime, RuntimeCapabilities};
pub use wasm::{WasmRuntime, WasmRuntimeLoader};
