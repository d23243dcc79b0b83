use exerciser_core::FetchError;
use thiserror::Error;

/// Why a single library could not be loaded
#[derive(Debug, Error)]
pub enum LibraryLoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not compile library: {0}")]
    Compile(String),

    #[error("library imports {module}.{name}; libraries must be self-contained")]
    RequiresImports { module: String, name: String },

    #[error("could not instantiate library: {0}")]
    Instantiate(String),
}
