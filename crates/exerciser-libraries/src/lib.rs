//! exerciser-libraries: Extension libraries bound into expressions
//!
//! Each `ExternalLibrarySpec` names a URL and the module name its exports are
//! bound under. Loading is concurrent and isolated: one library failing to
//! fetch or compile never prevents the others from loading, and the handles
//! come back in the order the specs were given.
//!
//! ```text
//! [spec A, spec B, spec C] ──join_all──▶ [handle A, handle B (error), handle C]
//!                                              │
//!                                     library_bindings()
//!                                              ▼
//!                              { "A": Library, "C": Library }
//! ```
//!
//! Fetched modules are compiled as-is. The loader does not sanitize what it
//! runs; callers decide which URLs are trusted.

mod error;
mod handle;
mod loader;
mod module;

pub use error::LibraryLoadError;
pub use handle::{library_bindings, ExternalLibrarySpec, LibraryHandle};
pub use loader::LibraryLoader;
pub use module::{ExportKind, LibraryExport, LibraryModule};
