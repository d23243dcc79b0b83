//! Exerciser: evaluate expressions against JSON documents
//!
//! Convenience re-exports of the workspace crates. The binary lives in
//! `crates/exerciser-cli`.

pub use exerciser_core as model;
pub use exerciser_dispatch as dispatch;
pub use exerciser_libraries as libraries;
pub use exerciser_runtime as runtime;
pub use exerciser_serializer as serializer;
